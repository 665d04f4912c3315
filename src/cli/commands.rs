//! CLI commands and argument parsing

use crate::types::{ListMode, LookupKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Folder traversal and resource operations for Drive-style stores
#[derive(Parser, Debug)]
#[command(name = "drivewalk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Reader configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve calls from an in-memory store loaded from this fixture (YAML)
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List resources under a folder
    List {
        /// Starting folder id (overrides the config)
        #[arg(long, conflicts_with = "folder_name")]
        folder_id: Option<String>,

        /// Starting folder name or path (overrides the config)
        #[arg(long)]
        folder_name: Option<String>,

        /// Kinds to list (overrides the config)
        #[arg(long)]
        mode: Option<ListModeArg>,

        /// Descend into subfolders
        #[arg(short, long)]
        recursive: bool,

        /// Run this query against the whole store instead
        #[arg(long)]
        query: Option<String>,

        /// Parquet file to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum records to read
        #[arg(long)]
        max_records: Option<usize>,
    },

    /// Resolve a name or path to an identifier
    Resolve {
        /// Name or slash-delimited path
        path: String,

        /// Kind of resource to look for
        #[arg(long, default_value = "either")]
        kind: KindArg,

        /// Include trashed folders while walking the path
        #[arg(long)]
        trashed: bool,

        /// Include items shared with the caller
        #[arg(long)]
        shared: bool,
    },

    /// Create a folder
    Mkdir {
        /// Name of the new folder
        name: String,

        /// Parent folder path (default: the root)
        #[arg(long, default_value = "/")]
        parent: String,
    },

    /// Copy or move a file, or copy a folder tree
    Copy {
        /// Path of the file or folder to copy
        source: String,

        /// Destination folder path
        dest: String,

        /// Name of the copy
        #[arg(long)]
        name: Option<String>,

        /// Delete the source file afterwards
        #[arg(long = "move", conflicts_with = "recursive")]
        move_file: bool,

        /// Source is a folder; copy its whole tree
        #[arg(short, long)]
        recursive: bool,
    },

    /// Trash or permanently delete a file or folder
    Delete {
        /// Path of the file or folder
        path: String,

        /// Delete permanently instead of trashing
        #[arg(long)]
        permanent: bool,

        /// Include items shared with the caller
        #[arg(long)]
        shared: bool,
    },

    /// Upload a local file into a folder
    Put {
        /// Local file to upload
        file: PathBuf,

        /// Destination folder path
        #[arg(long, default_value = "/")]
        parent: String,

        /// Remote name (default: the local file name)
        #[arg(long)]
        name: Option<String>,

        /// Replace an existing file with the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Download a file, exporting native documents
    Get {
        /// Path of the file
        path: String,

        /// Local file to write (default: print the content)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append the content's extension to the output file name
        #[arg(long)]
        add_ext: bool,

        /// Export format override, as SOURCE_MIME=TARGET_MIME:EXTENSION
        #[arg(long = "export", value_name = "MAPPING")]
        exports: Vec<String>,

        /// Include trashed files and folders while walking the path
        #[arg(long)]
        trashed: bool,
    },

    /// Validate the reader configuration
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
    /// Parquet file, with log and summary messages on stdout
    Parquet,
}

/// Kinds a listing yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListModeArg {
    Files,
    Directories,
    Both,
}

impl From<ListModeArg> for ListMode {
    fn from(arg: ListModeArg) -> Self {
        match arg {
            ListModeArg::Files => ListMode::Files,
            ListModeArg::Directories => ListMode::Directories,
            ListModeArg::Both => ListMode::Both,
        }
    }
}

/// Kind constraint for name resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    File,
    Folder,
    Either,
}

impl From<KindArg> for LookupKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::File => LookupKind::File,
            KindArg::Folder => LookupKind::Folder,
            KindArg::Either => LookupKind::Either,
        }
    }
}
