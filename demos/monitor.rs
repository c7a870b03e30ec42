use std::env;
use std::time::Duration;

use xcc_client::XccClient;

#[tokio::main]
async fn main() -> xcc_client::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let ip = args.get(1).expect("usage: monitor <ip> [user] [password]");
    let user = args.get(2).map(String::as_str).unwrap_or("xcc");
    let password = args.get(3).map(String::as_str).unwrap_or("xcc");

    let mut client = XccClient::builder(ip)
        .credentials(user, password)
        .poll_interval(Duration::from_secs(30))
        .on_event(|event| {
            println!("{event:?}");
        })
        .on_snapshot(|snapshot| {
            for (device, entity) in snapshot.iter() {
                let name = entity
                    .spec
                    .as_ref()
                    .map(|s| s.friendly_name_en.as_str())
                    .unwrap_or(entity.prop.as_str());
                let unit = entity
                    .spec
                    .as_ref()
                    .and_then(|s| s.unit.as_deref())
                    .unwrap_or("");
                println!("[{device}] {name}: {}{unit}", entity.value);
            }
            println!("-- {} entities --", snapshot.len());
        })
        .build();

    println!("Connecting to {ip}...");
    client.connect().await?;
    println!("Connected. Polling for updates...");

    client.run().await
}
