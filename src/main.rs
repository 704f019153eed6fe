mod cli;

#[tokio::main]
async fn main() {
    let config = match cli::run() {
        cli::RunOutcome::Serve(config) => config,
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    println!("listening on http://{}", config.listen);

    prisvarsel::serve(config).await;
}
