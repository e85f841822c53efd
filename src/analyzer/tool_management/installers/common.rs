use super::PackageManagerKind;
use crate::analyzer::tool_management::ToolIdentity;

/// Install steps for one tool under one package manager. Each step is an
/// argument vector; steps run in order and stop at the first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRecipe {
    pub manager: PackageManagerKind,
    pub steps: Vec<Vec<String>>,
}

impl InstallRecipe {
    /// Copy-pasteable rendering, e.g. `sudo apt-get update && sudo apt-get install -y steghide`.
    pub fn display_command(&self) -> String {
        let prefix = if self.manager.needs_root() { "sudo " } else { "" };
        self.steps
            .iter()
            .map(|step| format!("{}{}", prefix, step.join(" ")))
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

fn step(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// The usual "install this one package" shape for each manager.
fn package_steps(manager: PackageManagerKind, package: &str) -> Option<Vec<Vec<String>>> {
    let steps = match manager {
        PackageManagerKind::Apt => vec![
            step(&["apt-get", "update"]),
            step(&["apt-get", "install", "-y", package]),
        ],
        PackageManagerKind::Yum => vec![step(&["yum", "install", "-y", package])],
        PackageManagerKind::Dnf => vec![step(&["dnf", "install", "-y", package])],
        PackageManagerKind::Pacman => vec![step(&["pacman", "-S", "--noconfirm", package])],
        PackageManagerKind::Brew => vec![step(&["brew", "install", package])],
        PackageManagerKind::Unknown => return None,
    };
    Some(steps)
}

fn package_name(tool: ToolIdentity, manager: PackageManagerKind) -> Option<&'static str> {
    use PackageManagerKind::*;
    let name = match (tool, manager) {
        (_, Unknown) => return None,
        (ToolIdentity::Stegoveritas, _) => return None,
        (ToolIdentity::Foremost, _) => "foremost",
        (ToolIdentity::Steghide, _) => "steghide",
        (ToolIdentity::Outguess, _) => "outguess",
        (ToolIdentity::Exiv2, _) => "exiv2",
        (ToolIdentity::Binwalk, _) => "binwalk",
        (ToolIdentity::Strings, _) => "binutils",
        (ToolIdentity::Exiftool, Apt) => "libimage-exiftool-perl",
        (ToolIdentity::Exiftool, Yum | Dnf) => "perl-Image-ExifTool",
        (ToolIdentity::Exiftool, Pacman) => "perl-image-exiftool",
        (ToolIdentity::Exiftool, Brew) => "exiftool",
        (ToolIdentity::Xxd, Apt) => "xxd",
        (ToolIdentity::Xxd, Yum | Dnf) => "vim-common",
        (ToolIdentity::Xxd, Pacman | Brew) => "vim",
    };
    Some(name)
}

/// stegoveritas is distributed through pip, so the manager only supplies pip.
fn stegoveritas_steps(manager: PackageManagerKind) -> Option<Vec<Vec<String>>> {
    let pip_install = step(&["pip3", "install", "stegoveritas"]);
    let steps = match manager {
        PackageManagerKind::Apt => vec![
            step(&["apt-get", "update"]),
            step(&["apt-get", "install", "-y", "python3-pip"]),
            pip_install,
        ],
        PackageManagerKind::Yum => vec![step(&["yum", "install", "-y", "python3-pip"]), pip_install],
        PackageManagerKind::Dnf => vec![step(&["dnf", "install", "-y", "python3-pip"]), pip_install],
        PackageManagerKind::Pacman => vec![
            step(&["pacman", "-S", "--noconfirm", "python-pip"]),
            step(&["pip", "install", "stegoveritas"]),
        ],
        PackageManagerKind::Brew => vec![step(&["brew", "install", "python3"]), pip_install],
        PackageManagerKind::Unknown => return None,
    };
    Some(steps)
}

/// Recipe for `tool` under `manager`, or `None` when only manual steps exist.
pub fn recipe_for(tool: ToolIdentity, manager: PackageManagerKind) -> Option<InstallRecipe> {
    let steps = match tool {
        ToolIdentity::Stegoveritas => stegoveritas_steps(manager)?,
        _ => package_steps(manager, package_name(tool, manager)?)?,
    };
    Some(InstallRecipe { manager, steps })
}

pub fn manual_instructions(tool: ToolIdentity) -> &'static str {
    match tool {
        ToolIdentity::Stegoveritas => "pip3 install stegoveritas && stegoveritas_install_deps",
        ToolIdentity::Foremost => "See https://github.com/korczis/foremost",
        ToolIdentity::Steghide => "See https://github.com/StefanoDeVuono/steghide",
        ToolIdentity::Outguess => "See https://github.com/crorvick/outguess",
        ToolIdentity::Strings => "Install GNU binutils from your distribution or https://www.gnu.org/software/binutils/",
        ToolIdentity::Exiv2 => "See https://exiv2.org",
        ToolIdentity::Exiftool => "See https://exiftool.org/install.html",
        ToolIdentity::Binwalk => "pip3 install binwalk",
        ToolIdentity::Xxd => "xxd ships with vim; install vim from your distribution",
    }
}
