fn main() {
    println!("cargo:rerun-if-changed=../boot/linker.ld");
    println!("cargo:rerun-if-changed=../boot/multiboot_entry.s");

    // The linker script only applies to the bare-metal image.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.starts_with("i686") {
        let manifest = std::env::var("CARGO_MANIFEST_DIR").unwrap();
        println!("cargo:rustc-link-arg-bins=-T{manifest}/../boot/linker.ld");
    }
}
