//! `uniqued` binary entry point: CLI parsing, bus name ownership, and the
//! `NameOwnerChanged` watcher that drives peer-death cleanup.

use clap::Parser;
use tokio_stream::StreamExt;
use zbus::fdo::{DBusProxy, RequestNameFlags};
use zbus::names::OwnedUniqueName;

use unique_daemon::{Daemon, UniqueService};

#[derive(Parser)]
#[command(name = "uniqued", version, about = "Cross-process memory dedup daemon")]
struct Cli {
    /// Replace an already-running instance instead of queueing behind it.
    #[arg(short, long)]
    replace: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build the tokio runtime");

    let local = tokio::task::LocalSet::new();
    let result = local.block_on(&rt, run(cli.replace));

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(replace: bool) -> zbus::Result<()> {
    let connection = zbus::Connection::session().await?;

    connection
        .object_server()
        .at(unique_proto::OBJECT_PATH, UniqueService::new(Daemon::new()))
        .await?;

    let dbus = DBusProxy::new(&connection).await?;

    let mut flags = RequestNameFlags::AllowReplacement.into();
    if replace {
        flags |= RequestNameFlags::ReplaceExisting;
    }
    dbus.request_name_with_flags(
        unique_proto::SERVICE_NAME.try_into().expect("valid bus name"),
        flags,
    )
    .await?;

    let our_name: Option<OwnedUniqueName> = connection.unique_name().map(|n| n.to_owned());
    let mut owner_changes = dbus.receive_name_owner_changed().await?;

    log::info!("uniqued listening as {}", unique_proto::SERVICE_NAME);

    while let Some(signal) = owner_changes.next().await {
        let args = match signal.args() {
            Ok(args) => args,
            Err(e) => {
                log::warn!("failed to decode NameOwnerChanged: {e}");
                continue;
            }
        };

        let name = args.name();
        let old_owner: Option<&zbus::names::UniqueName<'_>> = args.old_owner().as_ref();
        let new_owner: Option<&zbus::names::UniqueName<'_>> = args.new_owner().as_ref();

        if name.as_str() == unique_proto::SERVICE_NAME {
            let lost_to_someone_else = old_owner.map(|o| o.as_str())
                == our_name.as_ref().map(|n| n.as_str())
                && new_owner.map(|o| o.as_str()) != our_name.as_ref().map(|n| n.as_str());
            if lost_to_someone_else {
                return Err(zbus::Error::Failure(
                    "lost ownership of org.freedesktop.portal.Unique".into(),
                ));
            }
            continue;
        }

        if name.starts_with(':') && old_owner.map(|o| o.as_str()) == Some(name.as_str()) && new_owner.is_none()
        {
            let iface_ref = connection
                .object_server()
                .interface::<_, UniqueService>(unique_proto::OBJECT_PATH)
                .await?;
            let service = iface_ref.get().await;
            service.remove_peer(&OwnedUniqueName::try_from(name.as_str()).unwrap());
        }
    }

    Ok(())
}
