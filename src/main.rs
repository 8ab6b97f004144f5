use clap::{Parser, Subcommand};
use ipktool::archive::{IpkArchive, TYPE_COOKED, TYPE_PLAIN};
use ipktool::dir::{export_dir, import_dir};
use ipktool::ktape;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "ipktool",
    about = "Unpack, repack, diff and patch .ipk archives from Just Dance 2016+.\n\
             The ipk format is proprietary — ALWAYS MAKE BACKUPS OF YOUR WORK!"
)]
struct Cli {
    /// Verbose per-entry logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package a folder into an .ipk
    Pack {
        /// Folder previously produced by `unpack` (with .nik sidecars)
        input: PathBuf,
        /// Defaults to the folder name with an .ipk extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Unpack an .ipk into a folder of loose files plus sidecars
    Unpack {
        input: PathBuf,
        /// Defaults to the archive name without its extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Diff a modified folder against the original .ipk into a .patchipk
    Diff {
        /// Modified folder (with .nik sidecars)
        input: PathBuf,
        /// The shipped original .ipk
        #[arg(long)]
        original: PathBuf,
        /// Defaults to the original name with a .patchipk extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a .patchipk to an .ipk
    Apply {
        input: PathBuf,
        #[arg(long)]
        patch: PathBuf,
        /// Defaults to the patch name with an .ipk extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List archive contents
    List { input: PathBuf },
    /// Convert a .ktape.ckd to editable text, or text back to .ktape.ckd
    /// (direction is auto-detected from the trailing NUL of game JSON)
    Ktape { input: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    match cli.command {
        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("ipk"));
            println!("Input: {}\nOutput: {}", input.display(), output.display());

            let ipk = import_dir(&input)?;
            ipk.write_to(File::create(&output)?)?;
            println!("Packed {} entr{} into {}",
                ipk.entries.len(),
                if ipk.entries.len() == 1 { "y" } else { "ies" },
                output.display());
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension(""));
            println!("Input: {}\nOutput: {}", input.display(), output.display());

            let ipk = read_ipk(&input)?;
            export_dir(&ipk, &output)?;
            println!("Unpacked to {}", output.display());
        }

        // ── Diff ─────────────────────────────────────────────────────────────
        Commands::Diff { input, original, output } => {
            let output = output.unwrap_or_else(|| original.with_extension("patchipk"));
            println!(
                "Input: {}\nOriginal ipk: {}\nOutput: {}",
                input.display(),
                original.display(),
                output.display()
            );

            let from_folder = import_dir(&input)?;
            let shipped = read_ipk(&original)?;
            let patchipk = shipped.diff_with(&from_folder);
            patchipk.write_to(File::create(&output)?)?;
            println!(
                "Wrote {} with {} changed file(s)",
                output.display(),
                patchipk.entries.len()
            );
        }

        // ── Apply ────────────────────────────────────────────────────────────
        Commands::Apply { input, patch, output } => {
            let output = output.unwrap_or_else(|| patch.with_extension("ipk"));
            println!(
                "Input: {}\nPatchipk: {}\nOutput: {}",
                input.display(),
                patch.display(),
                output.display()
            );

            let mut ipk = read_ipk(&input)?;
            let patchipk = read_ipk(&patch)?;
            ipk.apply_patch(&patchipk)?;
            ipk.write_to(File::create(&output)?)?;
            println!("Patched archive written to {}", output.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let ipk = read_ipk(&input)?;
            println!("Archive: {}", input.display());
            if ipk.is_patch() {
                println!("Kind: patchipk (tags are CRC32s of the files replaced)");
            }
            println!("{:<56} {:>12} {:>10}  Type", "Path", "Size", "Tag");
            for it in &ipk.entries {
                let type_code = if it.path.ends_with(".ckd") { TYPE_COOKED } else { TYPE_PLAIN };
                println!(
                    "{:<56} {:>12} {:>10}  {}",
                    it.path,
                    it.contents.len(),
                    format!("{:08X}", it.tag),
                    type_code
                );
            }
            println!("{} entr{}", ipk.entries.len(),
                if ipk.entries.len() == 1 { "y" } else { "ies" });
        }

        // ── Ktape ────────────────────────────────────────────────────────────
        Commands::Ktape { input } => {
            let raw = std::fs::read(&input)?;
            if ktape::is_baked(&raw) {
                let text = ktape::unbake(&raw)?;
                let out = swap_suffix(&input, ".ktape.ckd", ".nik");
                std::fs::write(&out, text)?;
                println!("Uncooked file written to {}", out.display());
            } else {
                let baked = ktape::bake(std::str::from_utf8(&raw)?)?;
                let out = swap_suffix(&input, ".nik", ".ktape.ckd");
                std::fs::write(&out, baked)?;
                println!("Cooked file written to {}", out.display());
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn read_ipk(path: &Path) -> Result<IpkArchive, Box<dyn std::error::Error>> {
    let file = BufReader::new(File::open(path)?);
    Ok(IpkArchive::read_from(file)?)
}

fn swap_suffix(path: &Path, from: &str, to: &str) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_suffix(from) {
        Some(stem) => PathBuf::from(format!("{stem}{to}")),
        None => PathBuf::from(format!("{s}{to}")),
    }
}
