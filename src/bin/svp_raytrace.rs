use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::error::Error;
use svp_raytrace::{
    build_model, configure_thread_pool, constants::DEFAULT_PATH_CAPACITY, fan_requests, trace,
    trace_many, PathPoint, PathRecorder, RayRequest, RecordMode, SsvMode, TraceResult,
    VelocityModel,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "svp-raytrace")]
#[command(version)]
#[command(about = "Acoustic raytracing through a layered sound-velocity profile", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace a single ray
    Trace {
        #[command(flatten)]
        profile: ProfileArgs,

        #[command(flatten)]
        ssv: SsvArgs,

        /// Source depth (m)
        #[arg(short = 'z', long, default_value = "0.0")]
        depth: f64,

        /// Launch angle from vertical (degrees, negative to port, >90 upward)
        #[arg(short = 'a', long, default_value = "0.0", allow_negative_numbers = true)]
        angle: f64,

        /// Travel time budget (s)
        #[arg(short = 't', long, default_value = "1.0")]
        time: f64,

        /// Record and print the ray path
        #[arg(long)]
        path: bool,

        /// Maximum number of recorded path points
        #[arg(long, default_value_t = DEFAULT_PATH_CAPACITY)]
        capacity: usize,

        /// Record only layer crossings instead of sampling arcs
        #[arg(long)]
        table: bool,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: OutputFormat,
    },

    /// Trace a symmetric fan of beams in parallel
    Fan {
        #[command(flatten)]
        profile: ProfileArgs,

        #[command(flatten)]
        ssv: SsvArgs,

        /// Source depth (m)
        #[arg(short = 'z', long, default_value = "0.0")]
        depth: f64,

        /// Outermost beam angle on each side (degrees)
        #[arg(long, default_value = "60.0")]
        max_angle: f64,

        /// Number of beams
        #[arg(short = 'n', long, default_value = "11")]
        beams: usize,

        /// Travel time budget per beam (s)
        #[arg(short = 't', long, default_value = "1.0")]
        time: f64,

        /// Worker threads (defaults to one per core)
        #[arg(long)]
        threads: Option<usize>,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: OutputFormat,
    },

    /// Display the layers derived from a profile
    Info {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: OutputFormat,
    },
}

#[derive(Args)]
struct ProfileArgs {
    /// Profile node as DEPTH,VELOCITY (m, m/s); repeat in depth order
    #[arg(long = "node", value_name = "DEPTH,VELOCITY", value_parser = parse_node, required = true)]
    nodes: Vec<(f64, f64)>,
}

impl ProfileArgs {
    fn build(&self) -> Result<VelocityModel, Box<dyn Error>> {
        Ok(build_model(&self.nodes)?)
    }
}

#[derive(Args)]
struct SsvArgs {
    /// Surface sound velocity handling
    #[arg(long, default_value = "ignore")]
    ssv_mode: SsvChoice,

    /// Surface sound velocity used to steer the beam (m/s)
    #[arg(long, default_value = "0.0")]
    surface_velocity: f64,

    /// Receiver null angle (degrees)
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    null_angle: f64,
}

impl SsvArgs {
    fn request(&self, depth: f64, angle: f64, time: f64) -> RayRequest {
        RayRequest {
            source_depth: depth,
            launch_angle_deg: angle,
            max_time: time,
            ssv_mode: self.ssv_mode.into(),
            surface_velocity: self.surface_velocity,
            null_angle_deg: self.null_angle,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SsvChoice {
    Ignore,
    AssumeCorrect,
    AssumeIncorrect,
}

impl From<SsvChoice> for SsvMode {
    fn from(choice: SsvChoice) -> Self {
        match choice {
            SsvChoice::Ignore => SsvMode::Ignore,
            SsvChoice::AssumeCorrect => SsvMode::AssumeCorrect,
            SsvChoice::AssumeIncorrect => SsvMode::AssumeIncorrect,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Table,
}

#[derive(Debug, Serialize)]
struct TraceOutput {
    #[serde(flatten)]
    result: TraceResult,
    status_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<PathPoint>>,
}

#[derive(Debug, Serialize)]
struct BeamOutput {
    angle_deg: f64,
    #[serde(flatten)]
    result: Option<TraceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_node(s: &str) -> Result<(f64, f64), String> {
    let (depth, velocity) = s
        .split_once(',')
        .ok_or_else(|| format!("expected DEPTH,VELOCITY, got '{s}'"))?;
    let depth = depth
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad depth '{depth}': {e}"))?;
    let velocity = velocity
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad velocity '{velocity}': {e}"))?;
    Ok((depth, velocity))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Trace {
            profile,
            ssv,
            depth,
            angle,
            time,
            path,
            capacity,
            table,
            output,
        } => {
            let model = profile.build()?;
            let request = ssv.request(depth, angle, time);

            let (result, path) = if path {
                let mode = if table {
                    RecordMode::Table
                } else {
                    RecordMode::Full
                };
                let mut recorder = PathRecorder::new(capacity, mode);
                let result = trace(&model, &request, Some(&mut recorder))?;
                (result, Some(recorder.into_points()))
            } else {
                (model.trace(&request)?, None)
            };

            display_trace(
                TraceOutput {
                    result,
                    status_code: result.status.code(),
                    path,
                },
                output,
            )?;
        }
        Commands::Fan {
            profile,
            ssv,
            depth,
            max_angle,
            beams,
            time,
            threads,
            output,
        } => {
            configure_thread_pool(threads)?;
            let model = profile.build()?;
            let requests = fan_requests(&ssv.request(depth, 0.0, time), max_angle, beams)?;
            let rows: Vec<BeamOutput> = requests
                .iter()
                .zip(trace_many(&model, &requests))
                .map(|(request, result)| match result {
                    Ok(result) => BeamOutput {
                        angle_deg: request.launch_angle_deg,
                        result: Some(result),
                        error: None,
                    },
                    Err(e) => BeamOutput {
                        angle_deg: request.launch_angle_deg,
                        result: None,
                        error: Some(e.to_string()),
                    },
                })
                .collect();
            display_fan(&rows, output)?;
        }
        Commands::Info { profile, output } => {
            let model = profile.build()?;
            display_info(&model, output)?;
        }
    }
    Ok(())
}

fn display_trace(out: TraceOutput, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    let r = &out.result;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Csv => {
            println!("offset,depth,elapsed_time,status,status_code");
            println!(
                "{:.4},{:.4},{:.6},{},{}",
                r.offset, r.depth, r.elapsed_time, r.status, out.status_code
            );
            if let Some(path) = &out.path {
                println!();
                println!("path_offset,path_depth,path_time");
                for p in path {
                    println!("{:.4},{:.4},{:.6}", p.offset, p.depth, p.time);
                }
            }
        }
        OutputFormat::Table => {
            println!("╔════════════════════════════════════════╗");
            println!("║             RAY END POINT              ║");
            println!("╠════════════════════════════════════════╣");
            println!("║ Offset:            {:>10.3} m        ║", r.offset);
            println!("║ Depth:             {:>10.3} m        ║", r.depth);
            println!("║ Travel Time:       {:>10.6} s        ║", r.elapsed_time);
            println!(
                "║ Status:            {:>10} ({})      ║",
                r.status.to_string(),
                out.status_code
            );
            println!("╚════════════════════════════════════════╝");

            if let Some(path) = &out.path {
                println!("\nRay Path ({} points):", path.len());
                println!("┌────────────┬────────────┬────────────┐");
                println!("│ Offset (m) │ Depth (m)  │  Time (s)  │");
                println!("├────────────┼────────────┼────────────┤");
                for p in path {
                    println!("│ {:>10.3} │ {:>10.3} │ {:>10.6} │", p.offset, p.depth, p.time);
                }
                println!("└────────────┴────────────┴────────────┘");
            }
        }
    }
    Ok(())
}

fn display_fan(rows: &[BeamOutput], format: OutputFormat) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
        OutputFormat::Csv => {
            println!("angle_deg,offset,depth,elapsed_time,status");
            for row in rows {
                match (&row.result, &row.error) {
                    (Some(r), _) => println!(
                        "{:.3},{:.4},{:.4},{:.6},{}",
                        row.angle_deg, r.offset, r.depth, r.elapsed_time, r.status
                    ),
                    (None, error) => println!(
                        "{:.3},,,,error: {}",
                        row.angle_deg,
                        error.as_deref().unwrap_or_default()
                    ),
                }
            }
        }
        OutputFormat::Table => {
            println!("┌──────────┬────────────┬────────────┬────────────┬────────────┐");
            println!("│ Angle(°) │ Offset (m) │ Depth (m)  │  Time (s)  │   Status   │");
            println!("├──────────┼────────────┼────────────┼────────────┼────────────┤");
            for row in rows {
                match &row.result {
                    Some(r) => println!(
                        "│ {:>8.2} │ {:>10.3} │ {:>10.3} │ {:>10.6} │ {:>10} │",
                        row.angle_deg,
                        r.offset,
                        r.depth,
                        r.elapsed_time,
                        r.status.to_string()
                    ),
                    None => println!(
                        "│ {:>8.2} │ {:>10} │ {:>10} │ {:>10} │ {:>10} │",
                        row.angle_deg, "-", "-", "-", "error"
                    ),
                }
            }
            println!("└──────────┴────────────┴────────────┴────────────┴────────────┘");
            for row in rows {
                if let Some(error) = &row.error {
                    eprintln!("beam {:.2}°: {error}", row.angle_deg);
                }
            }
        }
    }
    Ok(())
}

fn display_info(model: &VelocityModel, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ModelSummary<'a> {
                nodes: &'a [svp_raytrace::VelocityNode],
                layers: &'a [svp_raytrace::Layer],
            }
            let summary = ModelSummary {
                nodes: model.nodes(),
                layers: model.layers(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Csv => {
            println!("layer,depth_top,depth_bottom,velocity_top,velocity_bottom,gradient,mode,depth_center");
            for (i, l) in model.layers().iter().enumerate() {
                println!(
                    "{},{},{},{},{},{:.6},{:?},{:.3}",
                    i,
                    l.depth_top,
                    l.depth_bottom,
                    l.velocity_top,
                    l.velocity_bottom,
                    l.gradient,
                    l.mode,
                    l.depth_center
                );
            }
        }
        OutputFormat::Table => {
            let (top, bottom) = model.depth_range();
            println!("╔════════════════════════════════════════╗");
            println!("║          SOUND VELOCITY MODEL          ║");
            println!("╠════════════════════════════════════════╣");
            println!("║ Nodes:             {:>10}          ║", model.nodes().len());
            println!("║ Layers:            {:>10}          ║", model.layer_count());
            println!("║ Depth Range:  {:>8.1} - {:>8.1} m    ║", top, bottom);
            println!("║ Max Velocity:      {:>10.2} m/s      ║", model.max_velocity());
            println!("╚════════════════════════════════════════╝");

            println!("\nLayers:");
            println!("┌─────┬──────────┬──────────┬──────────┬──────────┬────────────┬─────────────┐");
            println!("│  #  │  Top (m) │ Bot. (m) │ Vtop m/s │ Vbot m/s │ Grad (1/s) │    Mode     │");
            println!("├─────┼──────────┼──────────┼──────────┼──────────┼────────────┼─────────────┤");
            for (i, l) in model.layers().iter().enumerate() {
                println!(
                    "│ {:>3} │ {:>8.2} │ {:>8.2} │ {:>8.2} │ {:>8.2} │ {:>10.5} │ {:>11} │",
                    i,
                    l.depth_top,
                    l.depth_bottom,
                    l.velocity_top,
                    l.velocity_bottom,
                    l.gradient,
                    format!("{:?}", l.mode)
                );
            }
            println!("└─────┴──────────┴──────────┴──────────┴──────────┴────────────┴─────────────┘");
        }
    }
    Ok(())
}
