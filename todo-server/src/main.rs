use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use todo_server::{config, shutdown_signal, AppState, Config, Server, ServerError, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = config::load_dotenv();
    let cfg = Config::from_env();
    init_tracing(&cfg);

    match dotenv {
        Some(path) => info!(path = %path.display(), "loaded .env"),
        None => info!("no .env file found, using process environment"),
    }
    info!(version = env!("CARGO_PKG_VERSION"), "todo-server starting");

    let server = Server::new(cfg.shutdown_timeout).with_header_read_timeout(cfg.http_timeout);

    let store = match Store::connect(&cfg).await {
        Ok(store) => store,
        Err(e) => return Err(fatal(ServerError::Startup(e))),
    };
    info!(backend = store.backend(), "database ready");

    let addr = cfg.bind_address();
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            return Err(fatal(ServerError::Bind {
                addr: addr.to_string(),
                source,
            }))
        }
    };
    info!(%addr, "server listening");

    let app = todo_server::app(AppState::new(store, cfg));
    if let Err(e) = server.serve(listener, app, shutdown_signal()).await {
        return Err(fatal(e));
    }

    info!("server gracefully stopped");
    Ok(())
}

fn fatal(e: ServerError) -> anyhow::Error {
    error!(error = %e, "fatal");
    e.into()
}

/// `RUST_LOG` wins over `TODO_LOG`; an unparsable filter falls back to `info`.
fn init_tracing(cfg: &Config) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: TODO_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                    cfg.log_level, e
                );
                EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
