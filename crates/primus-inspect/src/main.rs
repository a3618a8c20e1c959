// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Inspects a content root through the primary asset manager.
//!
//! Usage:
//!   primus-inspect --content assets --settings assets.toml list
//!   primus-inspect --content assets --settings assets.toml bundles Hero:Knight
//!   primus-inspect --content assets --settings assets.toml load Hero:Knight --bundle UI

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use primus_core::asset::PrimaryAssetId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "primus-inspect")]
#[command(about = "Scan a content root and query or load its primary assets")]
struct Cli {
    /// Directory holding the `*.asset.ron` descriptor sidecars
    #[arg(long)]
    content: PathBuf,

    /// Virtual root the content directory is mounted at
    #[arg(long, default_value = "/Game")]
    mount: String,

    /// TOML settings listing the primary asset types to scan
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Subclass relations, written `Class=Parent`
    #[arg(long = "class", value_name = "CLASS=PARENT")]
    classes: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered type and its primary assets
    List {
        /// Only list this type
        #[arg(long = "type")]
        asset_type: Option<String>,
    },
    /// Print the bundle entries of a primary asset
    Bundles {
        /// Identifier written `Type:Name`
        id: PrimaryAssetId,

        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load primary assets with a bundle set and report what became resident
    Load {
        /// Identifiers written `Type:Name`
        #[arg(required = true)]
        ids: Vec<PrimaryAssetId>,

        /// Bundles to load alongside the primary assets
        #[arg(long = "bundle")]
        bundles: Vec<String>,

        /// Number of streaming worker threads
        #[arg(long, default_value_t = 2)]
        workers: usize,
    },
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let session = commands::Session::open(
        &cli.content,
        &cli.mount,
        cli.settings.as_deref(),
        &cli.classes,
    )?;
    match cli.command {
        Commands::List { asset_type } => session.list(asset_type.as_deref()),
        Commands::Bundles { id, json } => session.bundles(&id, json),
        Commands::Load {
            ids,
            bundles,
            workers,
        } => session.load(&ids, &bundles, workers),
    }
}
