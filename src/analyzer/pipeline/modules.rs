use std::path::{Path, PathBuf};

use super::params::AnalysisParameters;
use crate::analyzer::tool_management::ModuleKey;
use crate::common::command_utils::CommandSpec;

/// Sub-directory of the run's output directory a module writes into, when
/// the pipeline rather than the tool has to create it.
pub fn prepared_subdir(module: ModuleKey) -> Option<&'static str> {
    match module {
        ModuleKey::SteghideExtract => Some("steghide"),
        ModuleKey::Outguess => Some("outguess"),
        _ => None,
    }
}

/// What `module` writes under `output_dir` that nothing else shares. It is
/// removed before the module runs again, so a rerun never reports files from
/// an earlier run and foremost always gets the empty directory it insists on.
pub fn owned_output(module: ModuleKey, output_dir: &Path) -> Option<PathBuf> {
    match module {
        ModuleKey::Stegoveritas => Some(output_dir.join("stegoveritas")),
        ModuleKey::Foremost => Some(output_dir.join("foremost")),
        ModuleKey::SteghideExtract => Some(output_dir.join("steghide").join("extracted.bin")),
        ModuleKey::Outguess => Some(output_dir.join("outguess").join("outguess.out")),
        _ => None,
    }
}

/// Argument vector for `module`. `file` must already be absolute so it can
/// never be mistaken for an option.
pub fn build_command(
    module: ModuleKey,
    program: &Path,
    file: &Path,
    output_dir: &Path,
    params: &AnalysisParameters,
) -> CommandSpec {
    let spec = CommandSpec::new(program);
    match module {
        ModuleKey::Stegoveritas => spec
            .arg("-out")
            .arg(output_dir.join("stegoveritas"))
            .arg(file),
        ModuleKey::Foremost => spec
            .arg("-i")
            .arg(file)
            .arg("-o")
            .arg(output_dir.join("foremost")),
        ModuleKey::SteghideInfo => {
            let spec = spec.arg("info").arg(file);
            match &params.passphrase {
                Some(pass) => spec.arg("-p").secret_arg(pass),
                None => spec,
            }
        }
        ModuleKey::SteghideExtract => {
            let spec = spec.arg("extract").arg("-sf").arg(file).arg("-p");
            let spec = match &params.passphrase {
                Some(pass) => spec.secret_arg(pass),
                None => spec.arg(""),
            };
            spec.arg("-xf")
                .arg(output_dir.join("steghide").join("extracted.bin"))
                .arg("-f")
        }
        ModuleKey::Outguess => {
            let mut spec = spec;
            if let Some(key) = &params.key {
                spec = spec.arg("-k").secret_arg(key);
            }
            if let Some(count) = params.derivation_count {
                spec = spec.arg("-s").arg(count.to_string());
            }
            spec.arg("-r")
                .arg(file)
                .arg(output_dir.join("outguess").join("outguess.out"))
        }
        ModuleKey::Strings
        | ModuleKey::Exiv2
        | ModuleKey::Exif
        | ModuleKey::Binwalk
        | ModuleKey::Xxd => spec.arg(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn args(spec: &CommandSpec) -> Vec<String> {
        spec.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn passphrase_is_one_literal_argument() {
        let params = AnalysisParameters {
            passphrase: Some("\"; rm -rf / #".to_string()),
            ..Default::default()
        };
        let spec = build_command(
            ModuleKey::SteghideExtract,
            Path::new("/usr/bin/steghide"),
            Path::new("/srv/uploads/abc/abc.jpg"),
            Path::new("/srv/uploads/abc"),
            &params,
        );
        assert_eq!(spec.program, PathBuf::from("/usr/bin/steghide"));
        assert_eq!(
            args(&spec),
            vec![
                "extract",
                "-sf",
                "/srv/uploads/abc/abc.jpg",
                "-p",
                "\"; rm -rf / #",
                "-xf",
                "/srv/uploads/abc/steghide/extracted.bin",
                "-f"
            ]
        );
        assert!(!spec.to_string().contains("rm -rf"));
    }

    #[test]
    fn outguess_takes_key_and_derivation_count() {
        let params = AnalysisParameters {
            key: Some("k3y".to_string()),
            derivation_count: Some(7),
            ..Default::default()
        };
        let spec = build_command(
            ModuleKey::Outguess,
            Path::new("/usr/bin/outguess"),
            Path::new("/u/x.jpg"),
            Path::new("/u"),
            &params,
        );
        assert_eq!(
            args(&spec),
            vec!["-k", "k3y", "-s", "7", "-r", "/u/x.jpg", "/u/outguess/outguess.out"]
        );
    }

    #[test]
    fn simple_tools_get_only_the_file() {
        for module in [ModuleKey::Strings, ModuleKey::Exiv2, ModuleKey::Exif, ModuleKey::Binwalk, ModuleKey::Xxd] {
            let spec = build_command(
                module,
                Path::new("/bin/tool"),
                Path::new("/u/x.png"),
                Path::new("/u"),
                &AnalysisParameters::default(),
            );
            assert_eq!(spec.args, vec![OsString::from("/u/x.png")]);
        }
    }

    #[test]
    fn owned_outputs_match_command_targets() {
        let out = Path::new("/u");
        let params = AnalysisParameters {
            passphrase: Some("pw".into()),
            ..Default::default()
        };
        for module in [ModuleKey::Stegoveritas, ModuleKey::Foremost, ModuleKey::SteghideExtract, ModuleKey::Outguess] {
            let owned = owned_output(module, out).unwrap();
            let spec = build_command(module, Path::new("/bin/tool"), Path::new("/u/x.jpg"), out, &params);
            assert!(spec.args.contains(&owned.into_os_string()), "{}", module);
        }
        assert_eq!(owned_output(ModuleKey::SteghideInfo, out), None);
        assert_eq!(owned_output(ModuleKey::Strings, out), None);
    }

    #[test]
    fn info_without_passphrase_has_no_p_flag() {
        let spec = build_command(
            ModuleKey::SteghideInfo,
            Path::new("/usr/bin/steghide"),
            Path::new("/u/x.jpg"),
            Path::new("/u"),
            &AnalysisParameters::default(),
        );
        assert_eq!(args(&spec), vec!["info", "/u/x.jpg"]);
    }
}
