//! # Format registry
//!
//! A [`Registry`] is an ordered list of formats, each a name, a sniffing
//! predicate and a constructor for its [`MeshReader`]. Formats are added
//! explicitly; [`Registry::with_defaults`] registers the formats shipped with
//! this crate:
//!
//! ```
//! use ovf::prelude::*;
//! use std::io::Cursor;
//!
//! let text = concat!(
//!     "# OOMMF OVF 2.0\n# Segment count: 1\n# Begin: Segment\n# Begin: Header\n# Title: t\n",
//!     "# meshtype: irregular\n# pointcount: 1\n# valuedim: 1\n# meshunit: m\n",
//!     "# valueunits: A/m\n# valuelabels: Mx\n# xmin: 0\n# ymin: 0\n# zmin: 0\n",
//!     "# xmax: 0\n# ymax: 0\n# zmax: 0\n# End: Header\n# Begin: Data Text\n",
//!     "0 0 0 5\n# End: Data Text\n# End: Segment\n",
//! );
//!
//! let registry = Registry::with_defaults();
//! let mut input = Cursor::new(text.as_bytes());
//! assert_eq!(registry.detect(&mut input, "inline").unwrap().name, "ovf");
//!
//! let mesh = registry.read(&mut input, "inline").unwrap();
//! assert_eq!(mesh.len(), 1);
//! ```

use crate::prelude::*;

use crate::legacy::{SvfReader, VioReader};

use std::fs::File;
use std::io::{BufReader, SeekFrom};
use std::path::Path;

/// A rewindable input stream.
pub trait Source: BufRead + Seek {}

impl<T: BufRead + Seek + ?Sized> Source for T {}

/// Decoder of one file format into a mesh.
pub trait MeshReader {
    /// Read a mesh from `input`, which is positioned at its start. `source`
    /// names the input in errors and becomes the mesh file name.
    fn read_mesh(&mut self, input: &mut dyn Source, source: &str) -> Result<AnyMesh, Error>;
}

/// predicate deciding whether an input holds a given format
pub type Sniff = fn(&mut dyn Source) -> Result<bool, Error>;

/// One registered format.
#[derive(Clone, Copy)]
pub struct FormatEntry {
    pub name: &'static str,
    pub sniff: Sniff,
    pub make: fn() -> Box<dyn MeshReader>,
}

impl std::fmt::Debug for FormatEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatEntry").field("name", &self.name).finish()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no registered format recognizes `{input}`")]
pub struct UnsupportedFormat {
    input: String,
}

impl UnsupportedFormat {
    pub(crate) fn new<T: Into<String>>(input: T) -> Self {
        Self { input: input.into() }
    }

    /// name of the rejected input
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Ordered list of known formats.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    formats: Vec<FormatEntry>,
}

impl Registry {
    /// an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// OVF first, then VIO and SVF
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FormatEntry {
            name: "ovf",
            sniff: sniff_ovf,
            make: || Box::new(OvfReader),
        });
        registry.register(FormatEntry {
            name: "vio",
            sniff: VioReader::sniff,
            make: || Box::new(VioReader),
        });
        registry.register(FormatEntry {
            name: "svf",
            sniff: SvfReader::sniff,
            make: || Box::new(SvfReader),
        });
        registry
    }

    /// add a format; predicates run in registration order
    pub fn register(&mut self, entry: FormatEntry) {
        self.formats.push(entry);
    }

    pub fn formats(&self) -> impl Iterator<Item = &FormatEntry> {
        self.formats.iter()
    }

    /// The first format whose predicate accepts `input`.
    ///
    /// The input is rewound before every predicate and again after a match.
    /// A predicate that fails counts as no match.
    pub fn detect(&self, input: &mut dyn Source, source: &str) -> Result<&FormatEntry, Error> {
        for entry in &self.formats {
            input.seek(SeekFrom::Start(0))?;
            match (entry.sniff)(input) {
                Ok(true) => {
                    debug!(source, format = entry.name, "format detected");
                    input.seek(SeekFrom::Start(0))?;
                    return Ok(entry);
                }
                Ok(false) => {}
                Err(err) => debug!(source, format = entry.name, %err, "format predicate failed"),
            }
        }

        Err(UnsupportedFormat::new(source).into())
    }

    /// detect the format of `input` and read it
    pub fn read(&self, input: &mut dyn Source, source: &str) -> Result<AnyMesh, Error> {
        let entry = self.detect(input, source)?;
        let mut reader = (entry.make)();
        reader.read_mesh(input, source)
    }

    /// open `path` and read it with the matching format
    pub fn read_mesh<P: AsRef<Path>>(&self, path: P) -> Result<AnyMesh, Error> {
        let path = path.as_ref();
        let mut input = BufReader::new(File::open(path)?);
        self.read(&mut input, &path.display().to_string())
    }

    /// name of the format `path` holds
    pub fn identify<P: AsRef<Path>>(&self, path: P) -> Result<&'static str, Error> {
        let path = path.as_ref();
        let mut input = BufReader::new(File::open(path)?);
        let entry = self.detect(&mut input, &path.display().to_string())?;
        Ok(entry.name)
    }
}

/// [`MeshReader`] for OVF 1.0 and 2.0 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct OvfReader;

impl MeshReader for OvfReader {
    fn read_mesh(&mut self, input: &mut dyn Source, source: &str) -> Result<AnyMesh, Error> {
        parse::read_ovf(input, source)?.to_mesh(source)
    }
}

/// the first line, if short, must be an OVF identification line
fn sniff_ovf(input: &mut dyn Source) -> Result<bool, Error> {
    let mut line = Vec::new();
    (&mut *input).take(256).read_until(b'\n', &mut line)?;
    let line = String::from_utf8_lossy(&line);
    Ok(FileVersion::detect(line.trim_end()).is_some())
}
