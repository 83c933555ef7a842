use capacity::report::{format_flops, format_gb};
use capacity::{Calculation, CapacityEngine, Config, CoreRequest};
use clap::Parser;
use std::path::PathBuf;

#[cfg(feature = "cli")]
use capacity::{CoreResult, CpuSizingResult};
#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use tabled::{settings::Style, Table, Tabled};

#[derive(Parser, Debug)]
#[command(author, version, about = "LLM Serving Capacity Calculator", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Size the fleet for this many users (overrides [request])
    #[arg(long, conflicts_with = "units")]
    users: Option<u64>,

    /// Rate a fleet of this many units in users (overrides [request])
    #[arg(long)]
    units: Option<u64>,

    /// Minimal output (final sizing only)
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Save the full result to a JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn request_override(&self) -> Option<CoreRequest> {
        match (self.users, self.units) {
            (Some(users), _) => Some(CoreRequest::Capacity { users }),
            (None, Some(units)) => Some(CoreRequest::Performance { units }),
            (None, None) => None,
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[cfg(feature = "cli")]
fn row(metric: &str, value: String) -> SummaryRow {
    SummaryRow {
        metric: metric.to_string(),
        value,
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let use_color = !args.no_color;

    if !args.quiet {
        print_heading("LLM Serving Capacity Calculator", use_color);
        println!("Loading configuration from: {:?}\n", args.config);
    }

    let mut config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(request) = args.request_override() {
        config = config.with_request(request);
    }

    if !args.quiet {
        print_heading("Configuration:", use_color);
        println!(
            "  Hardware: {} ({}, {}, {})",
            config.hardware.name,
            format_flops(config.hardware.peak_flops),
            format_gb(config.hardware.memory_gb),
            config.hardware.device
        );
        println!(
            "  Model: {} ({})",
            config.model.display_name(),
            config.quantization
        );
        println!("  Request: {} mode", config.request.mode());
        println!();
    }

    let calculation = CapacityEngine::standard().calculate(&config);

    if args.quiet {
        println!(
            "{} units, {} max users",
            calculation.units(),
            calculation.max_users()
        );
    } else {
        print_calculation(&calculation, use_color);
    }

    if let Some(output_path) = args.output {
        match save_result_json(&calculation, &output_path) {
            Ok(_) => {
                if !args.quiet {
                    println!("\nResult saved to: {:?}", output_path);
                }
            }
            Err(e) => {
                eprintln!("Error saving result to JSON: {}", e);
            }
        }
    }
}

#[cfg(feature = "cli")]
fn print_heading(text: &str, use_color: bool) {
    if use_color {
        println!("{}", text.bright_cyan().bold());
    } else {
        println!("{}", text);
    }
}

#[cfg(not(feature = "cli"))]
fn print_heading(text: &str, _use_color: bool) {
    println!("{}", text);
}

#[cfg(feature = "cli")]
fn print_section(title: &str, rows: Vec<SummaryRow>, use_color: bool) {
    if use_color {
        println!("\n{}", title.yellow().bold());
    } else {
        println!("\n{}", title);
    }
    println!("{}", Table::new(&rows).with(Style::rounded()));
}

#[cfg(feature = "cli")]
fn print_calculation(calculation: &Calculation, use_color: bool) {
    match calculation {
        Calculation::Gpu(result) => print_gpu(result, use_color),
        Calculation::Cpu(result) => print_cpu(result, use_color),
    }
}

#[cfg(not(feature = "cli"))]
fn print_calculation(calculation: &Calculation, _use_color: bool) {
    // Fallback for when CLI features are not available
    calculation.print();
}

#[cfg(feature = "cli")]
fn print_gpu(result: &CoreResult, use_color: bool) {
    if use_color {
        println!(
            "{} ({} mode, {:?}-bound)",
            "Calculation Complete".bright_green().bold(),
            result.mode,
            result.bottleneck
        );
        println!("{}", "━".repeat(60).bright_black());
    } else {
        println!(
            "Calculation Complete ({} mode, {:?}-bound)",
            result.mode, result.bottleneck
        );
        println!("{}", "━".repeat(60));
    }

    print_section(
        "COMPUTE",
        vec![
            row("Decode FLOPs/token", format_flops(result.decode_flops_per_token)),
            row("Prefill FLOPs/token", format_flops(result.prefill_flops_per_token)),
            row("FLOPs per user", format_flops(result.flops_per_user)),
            row("Required FLOPs", format_flops(result.required_flops)),
            row("Effective per unit", format_flops(result.effective_flops_per_unit)),
            row("System FLOPs", format_flops(result.total_system_flops)),
            row(
                "Overheads",
                format!(
                    "prefill {:.1}%, attention {:.1}%",
                    result.prefill_overhead_pct, result.attention_overhead_pct
                ),
            ),
        ],
        use_color,
    );

    print_section(
        "MEMORY",
        vec![
            row("Model size", format_gb(result.model_size_gb)),
            row("KV bytes/token", format!("{:.0}", result.kv_bytes_per_token)),
            row("KV cache (total)", format_gb(result.kv_cache.total_gb)),
            row("KV cache (active)", format_gb(result.kv_cache.active_gb)),
            row("KV cache (offloaded)", format_gb(result.kv_cache.offloaded_gb)),
            row("VRAM per unit", format_gb(result.required_vram_per_unit_gb)),
        ],
        use_color,
    );

    let mut sizing = vec![
        row("Units", result.units.to_string()),
        row("Units for compute", result.units_for_compute.to_string()),
        row("Units for memory", result.units_for_memory.to_string()),
        row("Capacity margin", format!("x{:.2}", result.capacity_margin)),
    ];
    if let Some(users) = result.requested_users {
        sizing.push(row("Requested users", users.to_string()));
    }
    sizing.push(row("Max users", result.max_users.to_string()));
    sizing.push(row(
        "Tokens/s per unit",
        format!("{:.0}", result.throughput_per_unit),
    ));
    sizing.push(row(
        "Tokens/s total",
        format!("{:.0}", result.system_tokens_per_sec),
    ));
    print_section("SIZING", sizing, use_color);
}

#[cfg(feature = "cli")]
fn print_cpu(result: &CpuSizingResult, use_color: bool) {
    if use_color {
        println!(
            "{} ({} mode, {:?}-bound)",
            "CPU Sizing Complete".bright_green().bold(),
            result.mode,
            result.bottleneck
        );
        println!("{}", "━".repeat(60).bright_black());
    } else {
        println!(
            "CPU Sizing Complete ({} mode, {:?}-bound)",
            result.mode, result.bottleneck
        );
        println!("{}", "━".repeat(60));
    }

    print_section(
        "THROUGHPUT",
        vec![
            row("FLOPs/token", format!("{:.2} GFLOPS", result.flops_per_token_gflops)),
            row("Usable per CPU", format_flops(result.usable_flops_per_cpu)),
            row("Target tok/s per CPU", format!("{:.1}", result.target_tps_per_cpu)),
            row("Required tok/s", format!("{:.0}", result.total_required_tps)),
            row("Required FLOPs", format_flops(result.total_required_flops)),
            row("Delivered tok/s", format!("{:.0}", result.delivered_tps)),
        ],
        use_color,
    );

    print_section(
        "MEMORY",
        vec![
            row("Model RAM", format_gb(result.model_ram_gb)),
            row("KV cache RAM", format_gb(result.kv_cache.vram_gb)),
            row("Total RAM", format_gb(result.total_ram_gb)),
            row("RAM per CPU", format_gb(result.ram_per_cpu_gb)),
        ],
        use_color,
    );

    let mut sizing = vec![
        row("CPUs", result.final_cpus.to_string()),
        row(
            "CPUs (compute)",
            format!(
                "{:.2} -> {:.2} with prefill -> {}",
                result.cpus_compute, result.cpus_with_prefill, result.cpus_for_compute
            ),
        ),
        row("CPUs (memory)", result.cpus_for_memory.to_string()),
        row("Redundancy", format!("x{:.2}", result.redundancy_multiplier)),
    ];
    if let Some(users) = result.requested_users {
        sizing.push(row("Requested users", users.to_string()));
    }
    sizing.push(row("Max users", result.max_users.to_string()));
    print_section("SIZING", sizing, use_color);
}

fn save_result_json(
    calculation: &Calculation,
    path: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::json;

    let json_data = json!({
        "summary": {
            "device": calculation.device(),
            "units": calculation.units(),
            "max_users": calculation.max_users(),
        },
        "result": calculation,
    });

    std::fs::write(path, serde_json::to_string_pretty(&json_data)?)?;
    Ok(())
}
