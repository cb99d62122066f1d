use fmu_runner::FmiRunner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut runner = match FmiRunner::parse(std::env::args()) {
        Ok(runner) => runner,
        Err(err) => err.exit(),
    };

    let mut code = runner.load();
    if code == 0 {
        code = runner.initialize();
    }
    if code == 0 {
        code = runner.run(None);
    }
    let close_code = runner.close();
    if code == 0 {
        code = close_code;
    }
    std::process::exit(code);
}
