//! Image collection.
//!
//! Walks the configured files and directories, keeps the files that look
//! like usable backgrounds, and shuffles the result once.  A file is kept
//! when:
//!
//! * its path does not contain `thumbnail`,
//! * its extension is `jpg`, `jpeg`, `png` or `gif` (any case),
//! * its dimensions, if they can be read, satisfy the minimum width,
//!   minimum height and aspect filters.
//!
//! Files whose dimensions cannot be read are kept.

use log::{debug, error, warn};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Upper bound on collected files unless configured otherwise.
pub const DEFAULT_MAX_FILES: usize = 1000;

/// Aspect-ratio filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    #[default]
    Any,
    /// Width at least height.
    Landscape,
    /// Height greater than width.
    Portrait,
}

impl Aspect {
    fn accepts(self, width: u32, height: u32) -> bool {
        let ratio = f64::from(width) / f64::from(height.max(1));
        match self {
            Aspect::Any => true,
            Aspect::Landscape => ratio >= 1.0,
            Aspect::Portrait => ratio < 1.0,
        }
    }
}

impl FromStr for Aspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Aspect::Any),
            "landscape" => Ok(Aspect::Landscape),
            "portrait" => Ok(Aspect::Portrait),
            _ => Err(format!("aspect must be 'landscape', 'portrait', or 'any', got {:?}", s)),
        }
    }
}

/// Which files to collect and how many.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub aspect: Aspect,
    pub max_files: usize,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            min_width: None,
            min_height: None,
            aspect: Aspect::Any,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl Filter {
    /// Whether an image of `width` x `height` passes the size and aspect
    /// filters.
    pub fn accepts_dimensions(&self, width: u32, height: u32) -> bool {
        if self.min_width.is_some_and(|w| width < w) {
            debug!("{}x{} is not wide enough", width, height);
            return false;
        }
        if self.min_height.is_some_and(|h| height < h) {
            debug!("{}x{} is not tall enough", width, height);
            return false;
        }
        if !self.aspect.accepts(width, height) {
            debug!("{}x{} has the wrong aspect ratio", width, height);
            return false;
        }
        true
    }
}

/// Whether `path` names an image file by extension and is not a thumbnail.
pub fn is_candidate(path: &Path) -> bool {
    if path.to_string_lossy().contains("thumbnail") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}

/// Whether the file at `path` should be rotated through.
pub fn accepts_file(path: &Path, filter: &Filter) -> bool {
    if !is_candidate(path) {
        return false;
    }
    match image::image_dimensions(path) {
        Ok((width, height)) => filter.accepts_dimensions(width, height),
        Err(e) => {
            debug!("cannot probe {} ({}), accepting", path.display(), e);
            true
        }
    }
}

/// Collect accepted files under `roots`, in walk order.
///
/// Directories are walked recursively with their entries sorted by name.
/// Collection stops once `filter.max_files` files were accepted.
pub fn collect(roots: &[PathBuf], filter: &Filter) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        if !visit(root, filter, &mut files) {
            break;
        }
    }
    if files.len() >= filter.max_files {
        warn!("file count reached limit of {}", filter.max_files);
    }
    files
}

/// Returns `false` once the file limit is reached.
fn visit(path: &Path, filter: &Filter, files: &mut Vec<PathBuf>) -> bool {
    if files.len() >= filter.max_files {
        return false;
    }
    debug!("considering {}", path.display());

    if path.is_file() {
        if accepts_file(path, filter) {
            files.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        let entries = match std::fs::read_dir(path) {
            Ok(rd) => rd,
            Err(e) => {
                error!("can't expand directory {}: {}", path.display(), e);
                return true;
            }
        };
        let mut children: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        children.sort();
        for child in children {
            if !visit(&child, filter, files) {
                return false;
            }
        }
    } else {
        error!("{} is neither a file nor a directory", path.display());
    }
    files.len() < filter.max_files
}

/// Randomize the rotation order.
pub fn shuffle(files: &mut [PathBuf]) {
    files.shuffle(&mut rand::rng());
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    /// Fresh empty directory under the system temp dir.
    fn tmp_dir() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("bgcycle-scan-test-{}-{}", std::process::id(), id));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"not really an image").unwrap();
    }

    #[test]
    fn candidates_by_extension() {
        assert!(is_candidate(Path::new("/p/a.jpg")));
        assert!(is_candidate(Path::new("/p/a.JPEG")));
        assert!(is_candidate(Path::new("/p/a.Png")));
        assert!(is_candidate(Path::new("/p/a.gif")));
        assert!(!is_candidate(Path::new("/p/a.bmp")));
        assert!(!is_candidate(Path::new("/p/README")));
        assert!(!is_candidate(Path::new("/p/thumbnails/a.jpg")));
    }

    #[test]
    fn dimension_filters() {
        let f = Filter {
            min_width: Some(1000),
            min_height: Some(500),
            aspect: Aspect::Landscape,
            ..Filter::default()
        };
        assert!(f.accepts_dimensions(1920, 1080));
        assert!(!f.accepts_dimensions(800, 1080));
        assert!(!f.accepts_dimensions(1920, 400));
        assert!(!f.accepts_dimensions(1000, 2000));

        let portrait = Filter {
            aspect: Aspect::Portrait,
            ..Filter::default()
        };
        assert!(portrait.accepts_dimensions(1080, 1920));
        assert!(!portrait.accepts_dimensions(1000, 1000));
    }

    #[test]
    fn aspect_parses_case_insensitively() {
        assert_eq!("Landscape".parse::<Aspect>(), Ok(Aspect::Landscape));
        assert_eq!("any".parse::<Aspect>(), Ok(Aspect::Any));
        assert!("square".parse::<Aspect>().is_err());
    }

    #[test]
    fn unprobeable_images_are_accepted() {
        let dir = tmp_dir();
        let file = dir.join("broken.jpg");
        touch(&file);
        let strict = Filter {
            min_width: Some(10_000),
            ..Filter::default()
        };
        assert!(accepts_file(&file, &strict));
    }

    #[test]
    fn collect_walks_recursively_and_filters() {
        let dir = tmp_dir();
        touch(&dir.join("a.jpg"));
        touch(&dir.join("notes.txt"));
        touch(&dir.join("sub/b.png"));
        touch(&dir.join("sub/deeper/c.gif"));
        touch(&dir.join("thumbnails/d.jpg"));

        let files = collect(&[dir.clone()], &Filter::default());
        assert_eq!(
            files,
            vec![dir.join("a.jpg"), dir.join("sub/b.png"), dir.join("sub/deeper/c.gif")]
        );
    }

    #[test]
    fn collect_accepts_plain_files_and_skips_missing() {
        let dir = tmp_dir();
        let file = dir.join("single.jpeg");
        touch(&file);
        let files = collect(&[dir.join("missing"), file.clone()], &Filter::default());
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn collect_stops_at_max_files() {
        let dir = tmp_dir();
        for i in 0..5 {
            touch(&dir.join(format!("{i}.jpg")));
        }
        let other = tmp_dir();
        touch(&other.join("x.jpg"));

        let filter = Filter {
            max_files: 3,
            ..Filter::default()
        };
        let files = collect(&[dir.clone(), other], &filter);
        assert_eq!(files, vec![dir.join("0.jpg"), dir.join("1.jpg"), dir.join("2.jpg")]);
    }

    #[test]
    fn shuffle_keeps_every_file() {
        let mut files: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i}.jpg"))).collect();
        let mut original = files.clone();
        shuffle(&mut files);
        files.sort();
        original.sort();
        assert_eq!(files, original);
    }
}
