use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=Info.plist");

    let (Ok(out_dir), Ok(manifest_dir)) = (env::var("OUT_DIR"), env::var("CARGO_MANIFEST_DIR")) else {
        return;
    };

    // Camera builds on macOS need the usage description next to the binary
    let info_plist_src = Path::new(&manifest_dir).join("Info.plist");
    let info_plist_dst = Path::new(&out_dir).join("../../../Info.plist");

    if info_plist_src.exists() {
        if let Err(e) = fs::copy(&info_plist_src, &info_plist_dst) {
            println!("cargo:warning=Failed to copy Info.plist: {}", e);
        }
    }
}
