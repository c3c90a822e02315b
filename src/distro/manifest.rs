//! Repo manifests and revision pins.
//!
//! Only `revision` attributes of `<project>` elements are ever changed, in
//! place, so the rest of the document (comments, ordering, formatting) is
//! written back exactly as it was read.

use std::{fmt, fs, path::Path, str::FromStr};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CiError;

/// `NAME=REVISION`: check project `NAME` out at `REVISION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub project: String,
    pub revision: String,
}
impl FromStr for Pin {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((project, revision)) if !project.trim().is_empty() && !revision.trim().is_empty() => {
                Ok(Pin {
                    project: project.trim().to_owned(),
                    revision: revision.trim().to_owned(),
                })
            }
            _ => Err(CiError::InvalidPin(s.to_owned())),
        }
    }
}
impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.project, self.revision)
    }
}

/// A `<project>` element as listed by [`Manifest::projects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub revision: Option<String>,
}

/// A comment, or the start tag of a `<project>` element. Comments are
/// matched so that projects commented out are skipped.
static NODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<project\b[^>]*>").expect("Invalid manifest node regex")
});

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bname\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid name attribute regex")
});

static REVISION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\brevision\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("Invalid revision attribute regex")
});

fn is_comment(node: &str) -> bool {
    node.starts_with("<!--")
}

/// Value of the attribute matched by `re`, single or double quoted.
fn attribute<'t>(re: &Regex, tag: &'t str) -> Option<&'t str> {
    let captures = re.captures(tag)?;
    captures.get(1).or_else(|| captures.get(2)).map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    text: String,
}
impl Manifest {
    pub fn parse(text: impl Into<String>) -> Self {
        Manifest { text: text.into() }
    }

    pub fn load(path: &Path) -> Result<Self, CiError> {
        let text = fs::read_to_string(path).map_err(CiError::file(path))?;
        Ok(Manifest::parse(text))
    }

    pub fn save(&self, path: &Path) -> Result<(), CiError> {
        fs::write(path, &self.text).map_err(CiError::file(path))?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn projects(&self) -> Vec<Project> {
        NODE.find_iter(&self.text)
            .map(|node| node.as_str())
            .filter(|node| !is_comment(node))
            .filter_map(|tag| {
                Some(Project {
                    name: attribute(&NAME, tag)?.to_owned(),
                    revision: attribute(&REVISION, tag).map(str::to_owned),
                })
            })
            .collect()
    }

    /// Set the revision of the project named by `pin`, adding the attribute
    /// when the project has none.
    pub fn pin(&mut self, pin: &Pin) -> Result<(), CiError> {
        let mut found = false;

        let text = NODE.replace_all(&self.text, |node: &regex::Captures| {
            let tag = &node[0];
            if is_comment(tag) || attribute(&NAME, tag) != Some(pin.project.as_str()) {
                return tag.to_owned();
            }
            found = true;
            pinned(tag, &pin.revision)
        });
        if !found {
            return Err(CiError::UnknownProject(pin.project.clone()));
        }
        self.text = text.into_owned();
        debug!("pinned {}", pin);
        Ok(())
    }

    pub fn apply(&mut self, pins: &[Pin]) -> Result<(), CiError> {
        pins.iter().try_for_each(|pin| self.pin(pin))
    }
}

fn pinned(tag: &str, rev: &str) -> String {
    let attr = format!("revision=\"{}\"", rev);
    if REVISION.is_match(tag) {
        return REVISION.replace(tag, regex::NoExpand(&attr)).into_owned();
    }
    let (head, tail) = if let Some(head) = tag.strip_suffix("/>") {
        (head.trim_end(), " />")
    } else {
        (tag[..tag.len() - 1].trim_end(), ">")
    };
    format!("{} {}{}", head, attr, tail)
}
