// src/container/blocks.rs

//! Building blocks: whole-tool installers appended as single instructions
//!
//! Each block lowers to primitive instructions at render time and exposes
//! its runtime form, used when the next stage copies build results forward.

use super::instruction::Instruction;

/// Compiler capability handle published by a toolchain install
///
/// Library installs that must compile against the stage's compiler take
/// this handle; a stage without one cannot dispatch those installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub cc: String,
    pub cxx: String,
}

/// GNU compiler toolchain from the ubuntu-toolchain-r archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnuToolchain {
    version: String,
}

impl GnuToolchain {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
        }
    }

    /// The capability handle for compiling against this toolchain
    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            cc: "gcc".to_string(),
            cxx: "g++".to_string(),
        }
    }

    pub(crate) fn lower(&self) -> Vec<Instruction> {
        let version = &self.version;
        vec![
            Instruction::Comment(format!("GNU compiler {version}")),
            Instruction::Shell {
                commands: vec![
                    "apt-get update -y".to_string(),
                    "apt-get install -y --no-install-recommends software-properties-common"
                        .to_string(),
                    "add-apt-repository ppa:ubuntu-toolchain-r/test -y".to_string(),
                    "apt-get update -y".to_string(),
                    format!("apt-get install -y --no-install-recommends gcc-{version} g++-{version}"),
                    "rm -rf /var/lib/apt/lists/*".to_string(),
                    format!("update-alternatives --install /usr/bin/gcc gcc /usr/bin/gcc-{version} 30"),
                    format!("update-alternatives --install /usr/bin/g++ g++ /usr/bin/g++-{version} 30"),
                ],
            },
        ]
    }

    pub(crate) fn runtime(&self) -> Vec<Instruction> {
        vec![
            Instruction::Comment("GNU compiler runtime".to_string()),
            Instruction::Packages {
                packages: vec!["libgomp1".to_string()],
            },
        ]
    }
}

/// CMake binary installer under /usr/local
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmakeInstall {
    version: String,
}

impl CmakeInstall {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
        }
    }

    pub(crate) fn lower(&self) -> Vec<Instruction> {
        let version = &self.version;
        let installer = format!("cmake-{version}-linux-x86_64.sh");
        vec![
            Instruction::Comment(format!("CMake version {version}")),
            Instruction::Shell {
                commands: vec![
                    "mkdir -p /var/tmp".to_string(),
                    format!(
                        "wget -q -nc --no-check-certificate -P /var/tmp \
                         https://github.com/Kitware/CMake/releases/download/v{version}/{installer}"
                    ),
                    format!("/bin/sh /var/tmp/{installer} --prefix=/usr/local --skip-license"),
                    format!("rm -rf /var/tmp/{installer}"),
                ],
            },
        ]
    }
}

/// OpenMPI built from source with the stage's toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMpiInstall {
    version: String,
    toolchain: Toolchain,
    cuda: bool,
}

impl OpenMpiInstall {
    pub fn new(version: &str, toolchain: &Toolchain, cuda: bool) -> Self {
        Self {
            version: version.to_string(),
            toolchain: toolchain.clone(),
            cuda,
        }
    }

    /// Release series directory on the download server (major.minor)
    fn series(&self) -> String {
        let mut parts = self.version.split('.');
        match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => format!("{major}.{minor}"),
            _ => self.version.clone(),
        }
    }

    fn environment() -> Instruction {
        Instruction::Environment {
            variables: vec![
                ("PATH".to_string(), "/usr/local/openmpi/bin:$PATH".to_string()),
                (
                    "LD_LIBRARY_PATH".to_string(),
                    "/usr/local/openmpi/lib:$LD_LIBRARY_PATH".to_string(),
                ),
            ],
        }
    }

    pub(crate) fn lower(&self) -> Vec<Instruction> {
        let version = &self.version;
        let series = self.series();
        let cuda_flag = if self.cuda {
            "--with-cuda"
        } else {
            "--without-cuda"
        };
        let (cc, cxx) = (&self.toolchain.cc, &self.toolchain.cxx);
        vec![
            Instruction::Comment(format!("OpenMPI version {version}")),
            Instruction::Packages {
                packages: vec![
                    "bzip2".to_string(),
                    "file".to_string(),
                    "hwloc".to_string(),
                    "libnuma-dev".to_string(),
                    "make".to_string(),
                    "openssh-client".to_string(),
                    "perl".to_string(),
                    "tar".to_string(),
                    "wget".to_string(),
                ],
            },
            Instruction::Shell {
                commands: vec![
                    "mkdir -p /var/tmp".to_string(),
                    format!(
                        "wget -q -nc --no-check-certificate -P /var/tmp \
                         https://www.open-mpi.org/software/ompi/v{series}/downloads/openmpi-{version}.tar.bz2"
                    ),
                    format!("tar -x -f /var/tmp/openmpi-{version}.tar.bz2 -C /var/tmp -j"),
                    format!(
                        "cd /var/tmp/openmpi-{version} && CC={cc} CXX={cxx} ./configure \
                         --prefix=/usr/local/openmpi --disable-getpwuid \
                         --enable-orterun-prefix-by-default {cuda_flag} --without-verbs"
                    ),
                    format!("cd /var/tmp/openmpi-{version} && make -j$(nproc)"),
                    format!("cd /var/tmp/openmpi-{version} && make -j$(nproc) install"),
                    format!(
                        "rm -rf /var/tmp/openmpi-{version} /var/tmp/openmpi-{version}.tar.bz2"
                    ),
                ],
            },
            Self::environment(),
        ]
    }

    pub(crate) fn runtime(&self) -> Vec<Instruction> {
        vec![
            Instruction::Comment("OpenMPI".to_string()),
            Instruction::Packages {
                packages: vec!["hwloc".to_string(), "openssh-client".to_string()],
            },
            Instruction::Copy {
                from: None,
                src: "/usr/local/openmpi".to_string(),
                dest: "/usr/local/openmpi".to_string(),
            },
            Self::environment(),
        ]
    }
}

/// FFTW built from source with the stage's toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FftwInstall {
    version: String,
    toolchain: Toolchain,
    configure_opts: Vec<String>,
}

impl FftwInstall {
    pub fn new(version: &str, toolchain: &Toolchain, configure_opts: Vec<String>) -> Self {
        Self {
            version: version.to_string(),
            toolchain: toolchain.clone(),
            configure_opts,
        }
    }

    fn environment() -> Instruction {
        Instruction::Environment {
            variables: vec![(
                "LD_LIBRARY_PATH".to_string(),
                "/usr/local/fftw/lib:$LD_LIBRARY_PATH".to_string(),
            )],
        }
    }

    pub(crate) fn lower(&self) -> Vec<Instruction> {
        let version = &self.version;
        let (cc, cxx) = (&self.toolchain.cc, &self.toolchain.cxx);
        let opts = self.configure_opts.join(" ");
        vec![
            Instruction::Comment(format!("FFTW version {version}")),
            Instruction::Packages {
                packages: vec!["file".to_string(), "make".to_string(), "wget".to_string()],
            },
            Instruction::Shell {
                commands: vec![
                    "mkdir -p /var/tmp".to_string(),
                    format!(
                        "wget -q -nc --no-check-certificate -P /var/tmp \
                         http://www.fftw.org/fftw-{version}.tar.gz"
                    ),
                    format!("tar -x -f /var/tmp/fftw-{version}.tar.gz -C /var/tmp -z"),
                    format!(
                        "cd /var/tmp/fftw-{version} && CC={cc} CXX={cxx} ./configure \
                         --prefix=/usr/local/fftw {opts}"
                    ),
                    format!("cd /var/tmp/fftw-{version} && make -j$(nproc)"),
                    format!("cd /var/tmp/fftw-{version} && make -j$(nproc) install"),
                    format!("rm -rf /var/tmp/fftw-{version} /var/tmp/fftw-{version}.tar.gz"),
                ],
            },
            Self::environment(),
        ]
    }

    pub(crate) fn runtime(&self) -> Vec<Instruction> {
        vec![
            Instruction::Comment("FFTW".to_string()),
            Instruction::Copy {
                from: None,
                src: "/usr/local/fftw".to_string(),
                dest: "/usr/local/fftw".to_string(),
            },
            Self::environment(),
        ]
    }
}

/// Python 3 interpreter from OS packages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PythonInstall;

impl PythonInstall {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn lower(&self) -> Vec<Instruction> {
        vec![
            Instruction::Comment("Python".to_string()),
            Instruction::Packages {
                packages: vec!["python3".to_string()],
            },
        ]
    }

    pub(crate) fn runtime(&self) -> Vec<Instruction> {
        self.lower()
    }
}

/// Generic fetch-configure-build-install of a cmake project
///
/// The source tarball is fetched with `wget -nc` and kept after the build,
/// so several build variants of the same project share one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericCmakeBuild {
    /// Source tarball URL
    pub url: String,
    /// Unpacked source directory, relative to /var/tmp
    pub directory: String,
    /// Build directory, relative to the source directory
    pub build_directory: String,
    /// Installation prefix
    pub prefix: String,
    /// Environment variables set for the configure step
    pub build_environment: Vec<(String, String)>,
    /// Fully resolved cmake options
    pub cmake_opts: Vec<String>,
    /// Shell commands run before configuring
    pub preconfigure: Vec<String>,
    /// Run the check target between build and install
    pub check: bool,
}

impl GenericCmakeBuild {
    fn tarball(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }

    pub(crate) fn lower(&self) -> Vec<Instruction> {
        let directory = &self.directory;
        let build_directory = format!("/var/tmp/{}/{}", directory, self.build_directory);
        let environment: String = self
            .build_environment
            .iter()
            .map(|(key, value)| format!("{key}={value} "))
            .collect();

        let mut commands = vec![
            "mkdir -p /var/tmp".to_string(),
            format!(
                "wget -q -nc --no-check-certificate -P /var/tmp {}",
                self.url
            ),
            format!("tar -x -f /var/tmp/{} -C /var/tmp -z", self.tarball()),
        ];
        commands.extend(self.preconfigure.iter().cloned());
        commands.push(format!("mkdir -p {build_directory}"));
        commands.push(format!(
            "cd {build_directory} && {environment}cmake -DCMAKE_INSTALL_PREFIX={} {} /var/tmp/{directory}",
            self.prefix,
            self.cmake_opts.join(" ")
        ));
        commands.push(format!(
            "cmake --build {build_directory} --target all -- -j$(nproc)"
        ));
        if self.check {
            commands.push(format!(
                "cmake --build {build_directory} --target check -- -j$(nproc)"
            ));
        }
        commands.push(format!(
            "cmake --build {build_directory} --target install -- -j$(nproc)"
        ));
        commands.push(format!("rm -rf /var/tmp/{directory}"));

        vec![
            Instruction::Comment(self.url.clone()),
            Instruction::Shell { commands },
        ]
    }

    pub(crate) fn runtime(&self) -> Vec<Instruction> {
        vec![
            Instruction::Comment(format!("{} installation", self.prefix)),
            Instruction::Copy {
                from: None,
                src: self.prefix.clone(),
                dest: self.prefix.clone(),
            },
        ]
    }
}
