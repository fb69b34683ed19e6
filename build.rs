// Build script for magickwand-bridge
//
// The native MagickWand library is only linked when the `magick` feature is
// enabled. Library name and location can be overridden from the environment:
//
//   MAGICKWAND_LIB      link name (default: MagickWand-6.Q16)
//   MAGICKWAND_LIB_DIR  extra directory for the linker search path

fn main() {
    println!("cargo:rerun-if-changed=src/");
    println!("cargo:rerun-if-env-changed=MAGICKWAND_LIB");
    println!("cargo:rerun-if-env-changed=MAGICKWAND_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_MAGICK").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("MAGICKWAND_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }
    let lib = std::env::var("MAGICKWAND_LIB").unwrap_or_else(|_| "MagickWand-6.Q16".to_string());
    println!("cargo:rustc-link-lib=dylib={lib}");
}
