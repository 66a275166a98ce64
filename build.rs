//! Build script: version string and GPU toolkit pre-flight checks.
//!
//! whisper-rs-sys fails late and noisily when a GPU toolkit is missing, so
//! the GPU features check for the toolkit's CLI first.

use std::process::Command;

/// (feature env var, probe program, probe args, install hint)
const GPU_TOOLKITS: &[(&str, &str, &[&str], &str)] = &[
    (
        "CARGO_FEATURE_CUDA",
        "nvcc",
        &["--version"],
        "https://developer.nvidia.com/cuda-downloads",
    ),
    (
        "CARGO_FEATURE_VULKAN",
        "vulkaninfo",
        &["--summary"],
        "https://vulkan.lunarg.com/",
    ),
    (
        "CARGO_FEATURE_HIPBLAS",
        "rocminfo",
        &[],
        "https://rocm.docs.amd.com/",
    ),
    (
        "CARGO_FEATURE_OPENBLAS",
        "pkg-config",
        &["--exists", "openblas"],
        "sudo apt install libopenblas-dev",
    ),
];

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!hash.is_empty()).then_some(hash)
}

fn main() {
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    match git_hash() {
        Some(hash) => {
            println!("cargo:rustc-env=GIT_HASH={}", hash);
            println!("cargo:rustc-env=HOLDWATCH_VERSION={}+{}", version, hash);
        }
        None => println!("cargo:rustc-env=HOLDWATCH_VERSION={}", version),
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    for (feature, program, args, hint) in GPU_TOOLKITS {
        if std::env::var_os(feature).is_none() {
            continue;
        }
        let found = Command::new(program)
            .args(*args)
            .output()
            .is_ok_and(|out| out.status.success());
        if !found {
            panic!(
                "\n\n`{}` failed: the toolkit for {} is not installed.\n\
                 Install: {}\n\
                 Or build without GPU features: cargo build --release\n",
                program,
                feature.trim_start_matches("CARGO_FEATURE_").to_lowercase(),
                hint
            );
        }
        println!("cargo::warning={} detected", program);
    }
}
