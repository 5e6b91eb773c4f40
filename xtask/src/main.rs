use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "part_zipper_lambda";
const LAMBDA_BIN: &str = "zip_parts_lambda";
const CRATES: [&str; 2] = ["part_zipper_core", "part_zipper_lambda"];

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the part-zipper workspace",
    long_about = "Runs CI checks and packages the part-zipper function\n\
                  as a deployable Lambda `bootstrap` archive."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::All)]
        job: CiJob,
    },
    /// Build the function binary and write the deployment zip
    Package {
        /// Compilation target triple for the function binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
        /// Directory the archive is written to
        #[arg(long, default_value = "dist")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Unit and integration tests per crate
    Test,
    /// Lint + test
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_function(target: &str, profile: BuildProfile, out_dir: &Path) {
    if let Some(installed) = installed_rust_targets() {
        if !installed.iter().any(|name| name == target) {
            eprintln!(
                "error: target `{target}` is missing; run `rustup target add {target}` before packaging"
            );
            exit(1);
        }
    }

    step("Build function binary");
    let mut cargo_args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--target",
        target,
        "--bin",
        LAMBDA_BIN,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package bootstrap archive");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(LAMBDA_BIN);
    let archive_path = out_dir.join(format!("{LAMBDA_BIN}.zip"));
    let written = fs::create_dir_all(out_dir)
        .and_then(|()| write_bootstrap_zip(&binary_path, &archive_path));
    match written {
        Ok(binary_bytes) => eprintln!(
            "\nPackaged {} ({binary_bytes} byte binary)",
            archive_path.display()
        ),
        Err(error) => {
            eprintln!(
                "error: packaging {} into {} failed: {error}",
                binary_path.display(),
                archive_path.display()
            );
            exit(1);
        }
    }
}

/// Targets reported by rustup, or `None` when rustup is unavailable and the
/// check should be skipped.
fn installed_rust_targets() -> Option<Vec<String>> {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;

    Some(
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
    )
}

/// Lambda's custom runtimes launch an executable named `bootstrap` from the
/// archive root. Returns the size of the packaged binary.
fn write_bootstrap_zip(binary_path: &Path, zip_path: &Path) -> io::Result<u64> {
    let mut binary = fs::File::open(binary_path)?;
    let mut zip = ZipWriter::new(fs::File::create(zip_path)?);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);

    zip.start_file("bootstrap", options)?;
    let copied = io::copy(&mut binary, &mut zip)?;
    zip.finish()?;
    Ok(copied)
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_lint() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);
}

fn ci_test() {
    for crate_name in CRATES {
        step(&format!("Test {crate_name}"));
        run_cargo(&["test", "-p", crate_name]);
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Lint => ci_lint(),
                CiJob::Test => ci_test(),
                CiJob::All => {
                    ci_lint();
                    ci_test();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::Package {
            target,
            profile,
            out_dir,
        } => {
            package_function(&target, profile, &out_dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use zip::ZipArchive;

    use super::*;

    #[test]
    fn bootstrap_zip_holds_executable_binary() {
        let dir = tempfile::tempdir().expect("temp dir");
        let binary_path = dir.path().join(LAMBDA_BIN);
        let zip_path = dir.path().join("function.zip");
        fs::write(&binary_path, b"\x7fELF fake binary").expect("write binary");

        let copied = write_bootstrap_zip(&binary_path, &zip_path).expect("zip should be written");
        assert_eq!(copied, 16);

        let file = fs::File::open(&zip_path).expect("open zip");
        let mut archive = ZipArchive::new(file).expect("read zip");
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_name("bootstrap").expect("bootstrap entry");
        assert_eq!(entry.unix_mode().map(|mode| mode & 0o777), Some(0o755));
        let mut body = Vec::new();
        entry.read_to_end(&mut body).expect("read entry");
        assert_eq!(body, b"\x7fELF fake binary");
    }

    #[test]
    fn missing_binary_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");

        let error = write_bootstrap_zip(&dir.path().join("absent"), &dir.path().join("out.zip"))
            .expect_err("missing binary should fail");

        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(!dir.path().join("out.zip").exists());
    }
}
