use clap::Parser;
use rocket_cart::core::ConfigProvider;
use rocket_cart::utils::{logger, validation::Validate};
use rocket_cart::{
    CartCommand, CartError, CartStore, CliConfig, HttpCatalog, LocalStorage, ProductId,
    TomlConfig, TracingNotifier, UpdateProductAmount,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置 (若有指定)
    let toml_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => None,
    };

    // 初始化日誌
    let verbose = cli.verbose || toml_config.as_ref().is_some_and(|c| c.verbose());
    let json_logs = cli.log_json || toml_config.as_ref().is_some_and(|c| c.json_logs());
    logger::init_logger(verbose, json_logs);

    tracing::debug!("CLI config: {:?}", cli);

    let command = cli.command;
    let result = match toml_config {
        Some(config) => run(config, command).await,
        None => run(cli, command).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ rocket-cart failed: {} (Category: {:?})",
            e,
            e.category()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    Ok(())
}

async fn run<C: ConfigProvider + Validate>(
    config: C,
    command: CartCommand,
) -> Result<(), CartError> {
    // 驗證配置
    config.validate()?;

    let storage = LocalStorage::new(config.storage_dir());
    let catalog = HttpCatalog::from_config(&config)?;
    let store = CartStore::load_with_key(
        storage,
        catalog,
        TracingNotifier::with_stderr(),
        config.storage_key(),
    )
    .await?;

    tracing::info!(
        "🛒 Loaded cart with {} products from {}",
        store.cart().len(),
        config.storage_dir()
    );

    match command {
        CartCommand::Show => {}
        CartCommand::Add { product_id } => store.add_product(ProductId(product_id)).await,
        CartCommand::Remove { product_id } => {
            store.remove_product(ProductId(product_id)).await
        }
        CartCommand::Update { product_id, amount } => {
            store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId(product_id),
                    amount,
                })
                .await
        }
    }

    let cart = store.cart();
    println!("{}", serde_json::to_string_pretty(&*cart)?);
    println!(
        "📦 {} products, {} units in cart",
        cart.len(),
        cart.total_units()
    );

    Ok(())
}
