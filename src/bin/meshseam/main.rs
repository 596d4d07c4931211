//! meshseam CLI - seam chamfering command-line tool.
//!
//! Usage: meshseam <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `meshseam --help` for available commands. Set `RUST_LOG=debug` for
//! per-stage statistics.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use meshseam::algo::chamfer::{chamfer_with_progress, ChamferOptions};
use meshseam::algo::coincidence::{CoincidenceMap, DEFAULT_EPSILON};
use meshseam::algo::part::{process_part_with_progress, PartOptions};
use meshseam::algo::topology::{EdgeKind, EdgeTopology};
use meshseam::algo::weld::{weld_duplicate_vertices, WeldOptions};
use meshseam::algo::Progress;
use meshseam::io;
use meshseam::mesh::MeshBuffer;

#[derive(Parser)]
#[command(name = "meshseam")]
#[command(author, version, about = "Seam chamfering CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,

        /// Distance below which vertices coincide
        #[arg(long, default_value_t = DEFAULT_EPSILON)]
        epsilon: f64,
    },

    /// Chamfer the seams between a mesh and its companions
    Chamfer {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Companion mesh file (repeatable)
        #[arg(short, long = "companion")]
        companions: Vec<PathBuf>,

        /// Scale factor of the mesh in its scene
        #[arg(short, long, default_value = "1.0")]
        scale: f64,

        /// Bevel size in scene units
        #[arg(long, default_value = "0.02")]
        size: f64,

        /// Emit bridge triangles that touch companion vertices
        #[arg(long)]
        add_geometry: bool,

        /// Keep vertices on the outer boundary fixed
        #[arg(long)]
        lock_edges: bool,

        /// Drop texture coordinates from the output
        #[arg(long)]
        clear_uvs: bool,

        /// Distance below which vertices coincide
        #[arg(long, default_value_t = DEFAULT_EPSILON)]
        epsilon: f64,
    },

    /// Merge duplicated vertices
    Weld {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Distance below which positions coincide
        #[arg(long, default_value_t = DEFAULT_EPSILON)]
        epsilon: f64,
    },

    /// Remove unreferenced vertices
    Compact {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,
    },

    /// Process every mesh of a glTF part
    Part {
        /// Input glTF or GLB file
        input: PathBuf,

        /// Directory for the processed meshes (one PLY per mesh)
        output_dir: PathBuf,

        /// Bevel size in part units
        #[arg(long, default_value = "0.02")]
        size: f64,

        /// Skip chamfering
        #[arg(long)]
        no_chamfer: bool,

        /// Skip welding
        #[arg(long)]
        no_weld: bool,

        /// Keep texture coordinates
        #[arg(long)]
        keep_uvs: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, epsilon } => {
            cmd_info(&input, epsilon)?;
        }

        Commands::Chamfer {
            input,
            output,
            companions,
            scale,
            size,
            add_geometry,
            lock_edges,
            clear_uvs,
            epsilon,
        } => {
            let options = ChamferOptions::default()
                .with_scale(scale)
                .with_chamfer_size(size)
                .with_chamfer_geometry(add_geometry)
                .with_locked_edges(lock_edges)
                .with_epsilon(epsilon);
            cmd_chamfer(&input, &output, &companions, &options, clear_uvs)?;
        }

        Commands::Weld {
            input,
            output,
            epsilon,
        } => {
            cmd_weld(&input, &output, epsilon)?;
        }

        Commands::Compact { input, output } => {
            cmd_compact(&input, &output)?;
        }

        Commands::Part {
            input,
            output_dir,
            size,
            no_chamfer,
            no_weld,
            keep_uvs,
            sequential,
        } => {
            let options = PartOptions::default()
                .with_chamfer_size(size)
                .with_chamfer(!no_chamfer)
                .with_weld(!no_weld)
                .with_keep_uvs(keep_uvs)
                .with_parallel(!sequential);
            cmd_part(&input, &output_dir, &options)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Parallel items may finish out of order; never move backwards
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(previous);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        // Use carriage return to overwrite the line
        eprint!("\r[{}{}] {:3}% {:<40}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn describe(mesh: &MeshBuffer) -> String {
    format!("{} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count())
}

fn cmd_info(input: &Path, epsilon: f64) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.vertex_count());
    println!("Triangles: {}", mesh.triangle_count());

    let mut columns = vec!["positions", "normals"];
    if mesh.tangents.is_some() {
        columns.push("tangents");
    }
    if mesh.uvs.is_some() {
        columns.push("uvs");
    }
    println!("Attributes: {}", columns.join(", "));

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    let map = CoincidenceMap::try_build(&mesh.positions, epsilon)?;
    let clusters = map.clusters_of_at_least(2).count();
    let representatives = (0..map.len()).filter(|&v| map.is_representative(v)).count();
    println!(
        "Coincidence: {} distinct positions, {} shared by several vertices",
        representatives, clusters
    );

    let topology = EdgeTopology::build(&mesh.triangles, &map);
    println!(
        "Edges: {} interior, {} seam, {} boundary",
        topology.count(EdgeKind::Interior),
        topology.count(EdgeKind::BoundaryToOther),
        topology.count(EdgeKind::BoundaryToSelf)
    );

    Ok(())
}

fn cmd_chamfer(
    input: &Path,
    output: &Path,
    companion_paths: &[PathBuf],
    options: &ChamferOptions,
    clear_uvs: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    println!("Loaded: {}", describe(&mesh));

    let companions = companion_paths
        .iter()
        .map(io::load)
        .collect::<Result<Vec<_>, _>>()?;
    for (path, companion) in companion_paths.iter().zip(&companions) {
        println!("Companion: {} ({})", path.display(), describe(companion));
    }

    let start = Instant::now();
    println!(
        "Chamfering (size {}, scale {}, {} companions)...",
        options.chamfer_size,
        options.scale,
        companions.len()
    );
    let progress = create_progress();
    let mut result = chamfer_with_progress(&mesh, &companions, options, &progress)?;
    let elapsed = start.elapsed();

    if clear_uvs {
        result.mesh.clear_uvs();
    }

    let stats = &result.stats;
    println!(
        "Seams: {} edges, {} pushed / {} locked vertices",
        stats.seam_edges, stats.pushed_vertices, stats.locked_vertices
    );
    println!(
        "Added: {} bridge + {} fan triangles",
        stats.bridge_triangles, stats.fan_triangles
    );
    println!("Result: {}", describe(&result.mesh));
    io::save(&result.mesh, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_weld(input: &Path, output: &Path, epsilon: f64) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = io::load(input)?;
    println!("Loaded: {}", describe(&mesh));

    let start = Instant::now();
    let options = WeldOptions::default().with_position_epsilon(epsilon);
    let removed = weld_duplicate_vertices(&mut mesh, options)?;
    let elapsed = start.elapsed();

    println!("Welded: {} vertices removed", removed);
    println!("Result: {}", describe(&mesh));
    io::save(&mesh, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_compact(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = io::load(input)?;
    println!("Loaded: {}", describe(&mesh));

    let removed = mesh.compact();

    println!("Removed: {} unreferenced vertices", removed);
    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());

    Ok(())
}

fn cmd_part(
    input: &Path,
    output_dir: &Path,
    options: &PartOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = io::load_part(input)?;
    println!("Loaded part '{}': {} meshes", part.name, part.meshes.len());
    for mesh in &part.meshes {
        println!("  {} ({:?}): {}", mesh.name, mesh.role, describe(&mesh.buffer));
    }

    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!("Processing ({})...", mode);
    let start = Instant::now();
    let progress = create_progress();
    let processed = process_part_with_progress(&part, options, &progress)?;
    let elapsed = start.elapsed();

    std::fs::create_dir_all(output_dir)?;
    for (index, mesh) in processed.meshes.iter().enumerate() {
        let file_name = format!("{:02}_{}.ply", index, sanitize(&mesh.name));
        let path = output_dir.join(file_name);
        io::save(&mesh.buffer, &path)?;
        println!("Saved: {} ({})", path.display(), describe(&mesh.buffer));
    }
    println!("Done ({:.2?})", elapsed);

    Ok(())
}

/// Replace characters that are awkward in file names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
