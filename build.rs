//! Surfaces FFmpeg discovery hints for the `ffmpeg-sys-next` build.

use std::env;
use std::path::PathBuf;

const WATCHED_VARIABLES: [&str; 4] = [
    "FFMPEG_DIR",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // pkg-config finds libavcodec and libswscale everywhere but Windows.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match vcpkg_install_dir() {
        Some(dir) if dir.exists() => println!(
            "cargo:warning=Using vcpkg FFmpeg at {0}? Set FFMPEG_DIR={0} so libavcodec and libswscale are found.",
            dir.display()
        ),
        Some(dir) => println!(
            "cargo:warning=VCPKG_ROOT is set but {} holds no FFmpeg install.",
            dir.display()
        ),
        None => println!(
            "cargo:warning=FFMPEG_DIR is not set. Install FFmpeg (libavcodec, libswscale) and point FFMPEG_DIR at it."
        ),
    }
}

fn vcpkg_install_dir() -> Option<PathBuf> {
    let root = env::var_os("VCPKG_ROOT")?;
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    Some(PathBuf::from(root).join("installed").join(triplet))
}
