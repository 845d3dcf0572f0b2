use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use marquee::db::{get_db_pool, init_db};
use marquee::middleware::ClientCtx;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    marquee::app_config::init();
    init_db(marquee::app_config::database().url).await;

    let server = marquee::app_config::server();
    let db = get_db_pool().to_owned();

    let http = HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(Data::new(db.clone()))
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::BAD_REQUEST, marquee::web::error::render_400)
                    .handler(StatusCode::NOT_FOUND, marquee::web::error::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        marquee::web::error::render_500,
                    ),
            )
            .wrap(ClientCtx::default())
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(marquee::web::configure)
    });

    let http = if server.workers > 0 {
        http.workers(server.workers)
    } else {
        http
    };

    log::info!("Listening on {}", server.bind);
    http.bind(&server.bind)?.run().await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // A missing .env is fine; the environment and config.toml still apply.
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
