use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{split, ErrorResponse, Pipeline, SplitPlanInfo, SplitPlanSummary, SplitRequest, SplitResult};
use reqwest::{Client, Response};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// - En Docker: MASTER_URL=http://master:8080
/// - Local: default http://localhost:8080
fn master_base_url() -> String {
    env::var("MASTER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI para dividir pipelines en master + workers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Divide un pipeline localmente y escribe un JSON por pipeline generado
    Split {
        #[arg(value_name = "PIPELINE_JSON")]
        file: PathBuf,

        /// Directorio de salida
        #[arg(long, default_value = "./split-output")]
        out: PathBuf,
    },
    /// Envía un pipeline al master para que lo divida y guarde el plan
    Submit {
        #[arg(value_name = "PIPELINE_JSON")]
        file: PathBuf,
    },
    /// Consulta un plan guardado en el master
    Status {
        #[arg(value_name = "PLAN_ID")]
        id: String,
    },
    /// Lista los planes guardados en el master
    Plans,
}

fn read_pipeline(path: &Path) -> Result<Pipeline> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("no se pudo leer {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} no es un pipeline válido", path.display()))
}

/// Nombre de archivo seguro a partir del nombre de un worker.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Escribe `master.json` y un `<worker>.json` por worker. Devuelve los archivos escritos.
fn write_split_output(plan: &SplitResult, out: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out).with_context(|| format!("no se pudo crear {}", out.display()))?;

    let mut written = Vec::with_capacity(plan.workers.len() + 1);

    let master_path = out.join("master.json");
    fs::write(&master_path, serde_json::to_vec_pretty(&plan.master)?)
        .with_context(|| format!("no se pudo escribir {}", master_path.display()))?;
    written.push(master_path);

    for (name, worker) in &plan.workers {
        let path = out.join(format!("{}.json", file_stem(name)));
        fs::write(&path, serde_json::to_vec_pretty(&worker.pipeline)?)
            .with_context(|| format!("no se pudo escribir {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

fn print_plan(plan: &SplitResult) {
    println!("  cluster: {}", plan.cluster);
    println!(
        "  master : {} en {} ({} pasos)",
        plan.master.name,
        plan.master_node.hostname,
        plan.master.steps.len()
    );
    if plan.workers.is_empty() {
        println!("  workers: (ninguno)");
    } else {
        println!("  workers:");
        for w in plan.workers.values() {
            println!(
                "    - {} en {} ({} pasos)",
                w.pipeline.name,
                w.worker.hostname,
                w.pipeline.steps.len()
            );
        }
    }
    println!("  puertos: {}", plan.ports.len());
    for p in &plan.ports {
        println!("    {} -> {} [{}]", p.port, p.worker, p.channel);
    }
}

// Convierte una respuesta no exitosa en error, usando el mensaje del master si viene
async fn check(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(err) => bail!("el master respondió {}: {}", status, err.error),
        Err(_) => bail!("el master respondió {}", status),
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = master_base_url();

    match cli.command {
        Commands::Split { file, out } => {
            let pipeline = read_pipeline(&file)?;
            let plan = split(&pipeline)?;
            let written = write_split_output(&plan, &out)?;

            info!("{} archivos escritos en {}", written.len(), out.display());
            println!("Pipeline {} dividido:", pipeline.name);
            print_plan(&plan);
            println!("  archivos:");
            for f in written {
                println!("    - {}", f.display());
            }
        }

        Commands::Submit { file } => {
            let pipeline = read_pipeline(&file)?;
            let url = format!("{}/api/v1/splits", base_url);

            let resp = client.post(&url).json(&SplitRequest { pipeline }).send().await?;
            let info: SplitPlanInfo = check(resp).await?.json().await?;

            println!("Plan creado:");
            println!("  id: {}", info.id);
            println!("  pipeline: {}", info.pipeline);
            println!("  submitted_at: {}", info.submitted_at);
            print_plan(&info.plan);
        }

        Commands::Status { id } => {
            let url = format!("{}/api/v1/splits/{}", base_url, id);
            let resp = client.get(&url).send().await?;
            let info: SplitPlanInfo = check(resp).await?.json().await?;

            println!("Plan {}:", info.id);
            println!("  pipeline: {}", info.pipeline);
            println!("  submitted_at: {}", info.submitted_at);
            print_plan(&info.plan);
        }

        Commands::Plans => {
            let url = format!("{}/api/v1/splits", base_url);
            let resp = client.get(&url).send().await?;
            let plans: Vec<SplitPlanSummary> = check(resp).await?.json().await?;

            if plans.is_empty() {
                println!("No hay planes guardados.");
            }
            for p in plans {
                println!("Plan {}", p.id);
                println!("  pipeline    : {}", p.pipeline);
                println!("  cluster     : {}", p.cluster);
                println!("  workers     : {}", p.workers.join(", "));
                println!("  puertos     : {}", p.ports);
                println!("  submitted_at: {}", p.submitted_at);
                println!();
            }
        }
    }

    Ok(())
}
