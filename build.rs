use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo::rustc-check-cfg=cfg(bare_metal)");
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Hardware-only code (naked handlers, register programming) is compiled
    // for Thumb targets only, so the portable kernel core builds on the host.
    let target = env::var("TARGET").unwrap_or_default();
    match bare_metal_target(&target) {
        Ok(false) => return,
        Ok(true) => {}
        Err(reason) => panic!("{}", reason),
    }
    println!("cargo:rustc-cfg=bare_metal");

    // cortex-m-rt's link.x includes memory.x from the link search path
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::copy("memory.x", out_dir.join("memory.x")).expect("memory.x missing at crate root");
    println!("cargo:rustc-link-search={}", out_dir.display());
}

/// `Ok(true)` for a supported Thumb target, `Ok(false)` for the host.
///
/// Hard-float targets are refused: the SysTick handler saves a basic
/// 16-word frame and returns with EXC_RETURN 0xFFFFFFFD, which corrupts a
/// task whose exception entry stacked the extended FPU frame.
pub(crate) fn bare_metal_target(target: &str) -> Result<bool, String> {
    if !target.starts_with("thumb") {
        return Ok(false);
    }
    if target.ends_with("eabihf") {
        return Err(format!(
            "{target}: FPU context is not saved on task switch; build for the soft-float variant"
        ));
    }
    Ok(true)
}
