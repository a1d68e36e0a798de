// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: a tool version flag
fn version_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).value_name("VERSION").help(help)
}

fn build_cli() -> Command {
    Command::new("gmxforge")
        .version(env!("CARGO_PKG_VERSION"))
        .author("gmxforge Contributors")
        .about("Multi-stage container recipe generator for GROMACS builds")
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .default_value("docker")
                .help("Recipe format to emit (docker or singularity)"),
        )
        .arg(version_arg("ubuntu", "Ubuntu base distribution version"))
        .arg(version_arg("centos", "CentOS base distribution version"))
        .arg(version_arg("cuda", "CUDA base image version (GPU builds)"))
        .arg(version_arg("gcc", "GNU compiler version").default_value("9"))
        .arg(version_arg("cmake", "CMake version").default_value("3.17.1"))
        .arg(version_arg("openmpi", "OpenMPI version (enables MPI builds)"))
        .arg(version_arg("impi", "Intel MPI version (enables MPI builds)"))
        .arg(version_arg(
            "fftw",
            "FFTW version (without it GROMACS builds its own FFTW)",
        ))
        .arg(version_arg("gromacs", "GROMACS version to build").default_value("2020.1"))
        .arg(
            Arg::new("regtest")
                .long("regtest")
                .action(ArgAction::SetTrue)
                .help("Download and run the regression tests during the build"),
        )
        .arg(
            Arg::new("double")
                .long("double")
                .action(ArgAction::SetTrue)
                .help("Build double precision binaries"),
        )
        .arg(
            Arg::new("engines")
                .long("engines")
                .value_name("SPEC")
                .action(ArgAction::Append)
                .help("Engine variant, e.g. \"simd=avx2:rdtscp=on\" (repeatable)"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("gmxforge.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
