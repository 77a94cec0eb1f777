use anyhow::Result;
use clap::Parser;

use uy_enrichment::config::{OUTPUT_PATH_DEFAULT, VENTAS_URL_DEFAULT};
use uy_enrichment::logging::init_logging;
use uy_enrichment::{run, HttpFetcher, PipelineConfig};

#[derive(Parser)]
#[command(name = "uy-enrichment")]
#[command(about = "Enrich sales data with population and business counts per departamento")]
#[command(version)]
struct Cli {
    /// CSV URL of the sales dataset
    #[arg(long, default_value = VENTAS_URL_DEFAULT)]
    ventas_url: String,

    /// Output CSV file
    #[arg(long, default_value = OUTPUT_PATH_DEFAULT)]
    out_csv: String,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = PipelineConfig::default()
        .with_ventas_url(cli.ventas_url)
        .with_output_path(cli.out_csv);

    println!("📈 Enriquecimiento de ventas por departamento");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("ventas:    {}", config.ventas_url);
    println!("población: {}", config.poblacion_url);
    println!("empresas:  {}", config.empresas_url);

    let fetcher = HttpFetcher::new()?;
    let report = run(&config, &fetcher)?;

    println!("\n✓ {}", report.summary());
    if !report.unmatched_regions.is_empty() {
        println!("⚠ Departamentos sin coincidencia: {}", report.unmatched_regions.join(", "));
    }
    println!("Listo. Archivo generado: {}", report.output_path.display());

    Ok(())
}
