mod app;
mod calibration_loop;
mod clock;
mod device;
mod error;
mod schedule_reader;
mod sensor_feed;
mod supervisor;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
