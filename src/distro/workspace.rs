use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::{
    error::CiError,
    exec::{CommandRunner, ShellCommand},
};

use super::manifest::{Manifest, Pin};

pub const MANIFEST_URL: &str = "ssh://git@github.com/armmbed/mbl-manifest.git";

/// Where `repo init` keeps the manifests of a workspace.
pub const MANIFESTS_DIR: &str = ".repo/manifests";

/// Name of the shared downloads link inside the workspace.
pub const DOWNLOADS_LINK: &str = "downloads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroOptions {
    pub workspace: PathBuf,
    pub manifest_url: String,
    pub branch: String,
    /// Manifest of the first `repo init`, inside the manifest repository.
    pub base_manifest: String,
    /// Local manifest to pin and check out; its file name is kept.
    pub test_manifest: PathBuf,
    pub pins: Vec<Pin>,
    /// Download cache shared between workspaces.
    pub downloads: Option<PathBuf>,
    pub build_script: PathBuf,
}
impl Default for DistroOptions {
    fn default() -> Self {
        DistroOptions {
            workspace: "mbl_workspace".into(),
            manifest_url: MANIFEST_URL.into(),
            branch: "master".into(),
            base_manifest: "default.xml".into(),
            test_manifest: "default_test_01.xml".into(),
            pins: vec![],
            downloads: None,
            build_script: "do_build.sh".into(),
        }
    }
}

/// Checks a distro workspace out at pinned revisions and builds it.
pub struct DistroJob<'a> {
    opts: &'a DistroOptions,
    runner: &'a mut dyn CommandRunner,
}
impl<'a> DistroJob<'a> {
    pub fn new(opts: &'a DistroOptions, runner: &'a mut dyn CommandRunner) -> Self {
        DistroJob { opts, runner }
    }

    pub fn run(&mut self) -> Result<(), CiError> {
        let opts = self.opts;
        let ws = &opts.workspace;
        let manifest_name = file_name(&opts.test_manifest)?;

        fs::create_dir_all(ws).map_err(CiError::file(ws))?;
        self.repo(vec![
            "init",
            "-u",
            opts.manifest_url.as_str(),
            "-b",
            opts.branch.as_str(),
            "-m",
            opts.base_manifest.as_str(),
        ])?;

        self.write_test_manifest(&manifest_name)?;
        self.repo(vec!["init", "-m", manifest_name.as_str()])?;
        self.repo(vec!["sync"])?;

        if let Some(downloads) = &opts.downloads {
            link_downloads(downloads, &ws.join(DOWNLOADS_LINK))?;
        }
        self.build()
    }

    /// Pin the test manifest and install it next to the workspace manifests.
    pub fn write_test_manifest(&mut self, name: &str) -> Result<PathBuf, CiError> {
        let mut manifest = Manifest::load(&self.opts.test_manifest)?;
        manifest.apply(&self.opts.pins)?;

        let dir = self.opts.workspace.join(MANIFESTS_DIR);
        fs::create_dir_all(&dir).map_err(CiError::file(&dir))?;
        let path = dir.join(name);
        manifest.save(&path)?;
        info!(
            "installed {} with {} pin(s) as {}",
            self.opts.test_manifest.display(),
            self.opts.pins.len(),
            path.display()
        );
        Ok(path)
    }

    /// Copy the build script to the top of the workspace and run it there.
    pub fn build(&mut self) -> Result<(), CiError> {
        let opts = self.opts;
        let name = file_name(&opts.build_script)?;
        let installed = opts.workspace.join(&name);
        fs::copy(&opts.build_script, &installed).map_err(CiError::file(&opts.build_script))?;

        let command = ShellCommand::new(format!("./{}", name)).current_dir(&opts.workspace);
        self.runner.run(&command)
    }

    fn repo(&mut self, args: Vec<&str>) -> Result<(), CiError> {
        let command = ShellCommand::new("repo")
            .args(args)
            .current_dir(&self.opts.workspace);
        self.runner.run(&command)
    }
}

fn file_name(path: &Path) -> Result<String, CiError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CiError::File {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a file name"),
        })
}

fn link_downloads(target: &Path, link: &Path) -> Result<(), CiError> {
    if fs::symlink_metadata(link).is_ok() {
        warn!("{} already exists, leaving it alone", link.display());
        return Ok(());
    }
    symlink(target, link).map_err(CiError::file(link))?;
    info!("linked {} -> {}", link.display(), target.display());
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
