//! Generates `include/featureservice.h` from the `extern "C"` surface.

use std::env;

fn main() {
    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_pragma_once(true)
        .with_include_guard("FEATURESERVICE_H")
        .with_documentation(true)
        .with_cpp_compat(true)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(format!("{crate_dir}/include/featureservice.h"));
        }
        // A stale header is preferable to a failed library build.
        Err(e) => println!("cargo:warning=unable to generate C bindings: {e}"),
    }

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
}
