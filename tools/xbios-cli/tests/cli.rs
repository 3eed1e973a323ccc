//! Integration tests for the xbios command-line tool.
//!
//! These invoke the built `xbios` binary as a subprocess against fixture
//! files written to a temp directory. Marked `#[ignore]` because they
//! require the binary to be pre-built.
//!
//! Run with: `cargo test --test cli -- --ignored`

use std::path::{Path, PathBuf};
use std::process::Command;

use xbios_format::bios::{BLDR_BLOCK_LEN, MCPX_SHADOW_LEN};
use xbios_format::bldr::{BOOT_PARAMS_SIGNATURE, INIT_TABLE_HEADER_LEN};
use xbios_format::{BiosParts, BuildParams};

/// Locates the compiled `xbios` binary next to the test harness binary.
fn xbios_binary() -> PathBuf {
    let mut path = std::env::current_exe().expect("could not determine test binary path");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("xbios");
    path
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("xbios-cli-test-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Builds a minimal, well-formed 256 KiB image with no preldr and an empty
/// kernel/xcode stream, the way `xbios bld` would given matching parts.
fn build_fixture_image() -> Vec<u8> {
    let mut inittbl = vec![0u8; INIT_TABLE_HEADER_LEN];
    inittbl[2] = 0x70; // early-retail identifier
    let parts = BiosParts {
        init_table_and_xcodes: inittbl,
        bldr: vec![0u8; BLDR_BLOCK_LEN],
        compressed_kernel: Vec::new(),
        kernel_data_tail: Vec::new(),
    };
    let params = BuildParams {
        romsize: 256 * 1024,
        ..Default::default()
    };
    xbios_format::build(&parts, &params).expect("fixture image must build")
}

fn run(args: &[&str], cwd: &Path) -> std::process::Output {
    Command::new(xbios_binary())
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to execute xbios")
}

#[test]
#[ignore]
fn ls_reports_a_well_formed_fixture() {
    let dir = temp_dir("ls");
    let image_path = dir.join("fixture.bin");
    std::fs::write(&image_path, build_fixture_image()).unwrap();

    let output = run(&["ls", "--file", image_path.to_str().unwrap()], &dir);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "xbios ls failed (exit={:?}):\nstdout:\n{stdout}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr),
    );
    assert!(stdout.contains("image size:"));
    assert!(stdout.contains("boot params valid:  true"));
}

#[test]
#[ignore]
fn ls_rejects_a_bad_size() {
    let dir = temp_dir("ls-bad-size");
    let image_path = dir.join("bad.bin");
    std::fs::write(&image_path, vec![0u8; 12345]).unwrap();

    let output = run(&["ls", "--file", image_path.to_str().unwrap()], &dir);
    assert!(!output.status.success());
}

#[test]
#[ignore]
fn split_then_combine_round_trips_through_the_binary() {
    let dir = temp_dir("split-combine");
    let image = xbios_format::replicate(&build_fixture_image(), 512 * 1024).unwrap();
    let image_path = dir.join("image.bin");
    std::fs::write(&image_path, &image).unwrap();

    let bank_dir = dir.join("banks");
    let split_out = run(
        &[
            "split",
            "--file",
            image_path.to_str().unwrap(),
            "--romsize",
            "256",
            "--out-dir",
            bank_dir.to_str().unwrap(),
        ],
        &dir,
    );
    assert!(split_out.status.success(), "{:?}", split_out);

    let combined_path = dir.join("combined.bin");
    let combine_out = run(
        &[
            "combine",
            "--bank",
            bank_dir.join("bank0.bin").to_str().unwrap(),
            "--bank",
            bank_dir.join("bank1.bin").to_str().unwrap(),
            "--out",
            combined_path.to_str().unwrap(),
        ],
        &dir,
    );
    assert!(combine_out.status.success(), "{:?}", combine_out);

    let combined = std::fs::read(&combined_path).unwrap();
    assert_eq!(combined, image);
}

#[test]
#[ignore]
fn bld_writes_an_image_ls_can_then_load() {
    let dir = temp_dir("bld");
    let inittbl_path = dir.join("inittbl.bin");
    let bldr_path = dir.join("bldr.bin");
    let krnl_path = dir.join("krnl.bin");
    let krnl_data_path = dir.join("krnl_data.bin");
    let mut inittbl = vec![0u8; INIT_TABLE_HEADER_LEN];
    inittbl[2] = 0x70;
    std::fs::write(&inittbl_path, inittbl).unwrap();
    std::fs::write(&bldr_path, vec![0u8; BLDR_BLOCK_LEN]).unwrap();
    std::fs::write(&krnl_path, Vec::<u8>::new()).unwrap();
    std::fs::write(&krnl_data_path, Vec::<u8>::new()).unwrap();

    let out_path = dir.join("out.bin");
    let bld_out = run(
        &[
            "bld",
            "--inittbl",
            inittbl_path.to_str().unwrap(),
            "--bldr",
            bldr_path.to_str().unwrap(),
            "--krnl",
            krnl_path.to_str().unwrap(),
            "--krnl-data",
            krnl_data_path.to_str().unwrap(),
            "--romsize",
            "256",
            "--out",
            out_path.to_str().unwrap(),
        ],
        &dir,
    );
    assert!(bld_out.status.success(), "{:?}", bld_out);

    let built = std::fs::read(&out_path).unwrap();
    assert_eq!(built.len(), 256 * 1024);

    let bp_off = built.len() - MCPX_SHADOW_LEN - 28;
    let signature = u32::from_le_bytes([
        built[bp_off + 8],
        built[bp_off + 9],
        built[bp_off + 10],
        built[bp_off + 11],
    ]);
    assert_eq!(signature, BOOT_PARAMS_SIGNATURE);
}
