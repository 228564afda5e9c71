use std::{net::TcpListener, sync::Arc};

use actix_web::web;
use env_logger::Env;
use leadmap::{
    configuration::get_configuration,
    services::{
        CsvArtifactWriter, JobOrchestrator, JobRegistry, JobService, OrchestratorSettings,
        OverpassClient, WebsiteEmailFinder,
    },
    startup::run,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");
    let scraper = configuration.scraper;
    let rules = Arc::new(configuration.rules);

    std::fs::create_dir_all(&scraper.output_dir)?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    let overpass_client = OverpassClient::new(
        scraper.overpass_url.clone(),
        scraper.lookup_timeout(),
        rules.clone(),
        scraper.fallback_bbox.clone(),
    )
    .with_fallback_delay(scraper.politeness_delay());
    let orchestrator = JobOrchestrator::new(
        Arc::new(overpass_client),
        Arc::new(WebsiteEmailFinder::default()),
        Arc::new(CsvArtifactWriter::new(scraper.output_dir.clone())),
        rules,
        OrchestratorSettings {
            concurrency: scraper.concurrency,
            politeness_delay: scraper.politeness_delay(),
            enrichment_timeout: scraper.enrichment_timeout(),
            enrichment_delay: scraper.enrichment_delay(),
        },
    );

    let job_service = web::Data::new(JobService::new(
        Arc::new(JobRegistry::new()),
        Arc::new(orchestrator),
        scraper.default_max_results,
    ));

    log::info!("Listening on {}", listener.local_addr()?);

    run(listener, job_service, &scraper.output_dir)?.await
}
