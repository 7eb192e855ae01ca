use anyhow::Context;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tzstats::types::OpHash;
use tzstats::{Client, OpParams, Order, TableQuery, logging};
use tzstats_config::{Args, Command, ExplorerConfig, TableArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse_args();
    let config = ExplorerConfig::from_env_file(&args.env_file)?;
    logging::init_with_config((&config.log).into())?;

    let client = Client::from_config(&config)?;
    tracing::info!(api = %config.api.url, "explorer client ready");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    match args.command {
        Command::Ops(table) => {
            let list = client.query_ops(table_query("op", &table)?, &cancel).await?;
            tracing::info!(rows = list.len(), cursor = ?list.cursor(), "op table");
            print_json(&list)?;
        }
        Command::Blocks(table) => {
            let list = client.query_blocks(table_query("block", &table)?, &cancel).await?;
            tracing::info!(rows = list.len(), cursor = ?list.cursor(), "block table");
            print_json(&list)?;
        }
        Command::Op { hash } => {
            let hash: OpHash = hash.parse().context("invalid operation hash")?;
            let ops = client.get_op(&hash, &OpParams::new().with_prim(), &cancel).await?;
            print_json(&ops)?;
        }
    }
    Ok(())
}

fn table_query(table: &str, args: &TableArgs) -> anyhow::Result<TableQuery> {
    let order: Order = args.order.parse().map_err(anyhow::Error::msg)?;
    Ok(TableQuery::new(table)
        .with_columns(&args.columns)
        .with_limit(args.limit)
        .with_cursor(args.cursor)
        .with_order(order))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
