use std::{net::TcpListener, path::Path};

use actix_files::Files;
use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    routes::{default_route, job_route},
    services::JobService,
};

pub fn run(
    listener: TcpListener,
    job_service: Data<JobService>,
    output_dir: &Path,
) -> Result<Server, std::io::Error> {
    let output_dir = output_dir.to_path_buf();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(Files::new("/download", output_dir.clone()).prefer_utf8(true))
            .service(default_route::default)
            .service(job_route::create_job)
            .service(job_route::job_status)
            .app_data(web::JsonConfig::default().limit(256 * 1024))
            .app_data(job_service.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
