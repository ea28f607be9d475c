//! # Pronto POS Register
//!
//! Line-oriented register front end over the Cart State Manager.
//!
//! ## Startup Sequence
//! ```text
//! 1. Initialize tracing (RUST_LOG, default "info,pronto=debug")
//! 2. Load pos.toml + PRONTO_* environment overrides
//! 3. Open the file store (memory store if the directory is unusable)
//! 4. Build the HTTP backend and the Cart State Manager
//! 5. Restore the saved cart and customer
//! 6. Read commands from stdin until `quit` or EOF
//! ```

mod commands;
mod render;

use std::sync::Arc;

use pronto_cart::{
    CartError, CartManager, CartSettings, CheckoutOptions, Notice, NoticeCode, PosConfig,
};
use pronto_client::{ClientError, HttpBackend};
use pronto_core::filter::{Facets, ProductFilter};
use pronto_core::{Product, ProductId};
use pronto_store::{FileStore, KeyValueStore, MemoryStore};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use commands::{Command, HELP};

#[derive(Debug, Error)]
enum AppError {
    #[error("Backend client could not be created: {0}")]
    Backend(#[from] ClientError),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pronto=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Register stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = PosConfig::load_or_default(None);
    info!(
        store_id = %config.store.id,
        store_name = %config.store.name,
        api = %config.api.base_url,
        "Starting Pronto POS register"
    );

    let store = open_store(&config);
    let backend = Arc::new(
        HttpBackend::new(&config.api.base_url, config.api_timeout())?
            .with_endpoints(config.api.endpoints.clone())
            .with_default_headers(&config.api.headers)?,
    );

    let manager = CartManager::builder(store, backend.clone())
        .customers(backend.clone())
        .catalog(backend)
        .settings(CartSettings::from(&config))
        .build();

    let restored = manager.initialize();
    let mut register = Register {
        manager,
        symbol: config.store.currency_symbol.clone(),
        listing: Vec::new(),
        filter: ProductFilter::new(),
    };

    println!("{} - type 'help' for commands", config.store.name);
    for notice in &restored.notices {
        println!("{}", render::notice(notice));
    }
    println!("{}", render::cart(&register.symbol, &restored.snapshot));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => register.execute(command, &mut lines).await?,
            Err(e) => println!("{}", e),
        }
    }

    info!("Register closed");
    Ok(())
}

fn open_store(config: &PosConfig) -> Arc<dyn KeyValueStore> {
    let dir = config.storage_dir();
    match FileStore::open(dir.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, ?dir, "Storage directory unusable, cart will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn prompt(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}

/// Presentation state held between commands.
struct Register {
    manager: CartManager,
    symbol: String,
    /// Products from the last category or search listing.
    listing: Vec<Product>,
    filter: ProductFilter,
}

impl Register {
    async fn execute(
        &mut self,
        command: Command,
        lines: &mut Lines<BufReader<Stdin>>,
    ) -> Result<(), AppError> {
        let outcome = match command {
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Categories => self.manager.categories().await.map(|categories| {
                println!("{}", render::categories(&categories));
            }),
            Command::Category(id) => self
                .manager
                .products_in_category(id)
                .await
                .map(|products| self.show_listing(products)),
            Command::Search(query) => match self.manager.search_products(&query).await {
                Ok(Some(products)) => {
                    self.show_listing(products);
                    Ok(())
                }
                Ok(None) => self.manager.categories().await.map(|categories| {
                    println!("{}", render::categories(&categories));
                }),
                Err(e) => Err(e),
            },
            Command::Filter(filter) => {
                self.filter = filter;
                self.print_listing();
                Ok(())
            }
            Command::Facets => {
                println!("{}", render::facets(&Facets::from_products(&self.listing)));
                Ok(())
            }
            Command::Scan(code) => self.manager.scan_code(&code).await.map(|snapshot| {
                let notice = Notice::info(NoticeCode::ItemAdded, format!("Scanned {}", code));
                println!("{}", render::notice(&notice));
                println!("{}", render::cart(&self.symbol, &snapshot));
            }),
            Command::Add {
                product_id,
                quantity,
            } => self.add_from_listing(product_id, quantity),
            Command::Quantity {
                product_id,
                quantity,
            } => self
                .manager
                .update_quantity(product_id, quantity)
                .map(|snapshot| println!("{}", render::cart(&self.symbol, &snapshot))),
            Command::Remove(product_id) => {
                let snapshot = self.manager.remove_item(product_id);
                println!("{}", render::cart(&self.symbol, &snapshot));
                Ok(())
            }
            Command::Clear => {
                if !self.manager.is_empty() && confirm("Empty the cart? [y/N] ", lines).await? {
                    let snapshot = self.manager.clear();
                    println!("{}", render::cart(&self.symbol, &snapshot));
                }
                Ok(())
            }
            Command::Customer(Some(id)) => {
                self.manager
                    .select_customer_by_id(id)
                    .await
                    .map(|snapshot| println!("{}", render::cart(&self.symbol, &snapshot)))
            }
            Command::Customer(None) => {
                let snapshot = self.manager.select_customer(None);
                println!("{}", render::cart(&self.symbol, &snapshot));
                Ok(())
            }
            Command::Discount(Some(percent)) => self
                .manager
                .set_manual_discount(&percent)
                .map(|snapshot| println!("{}", render::cart(&self.symbol, &snapshot))),
            Command::Discount(None) => {
                let snapshot = self.manager.clear_manual_discount();
                println!("{}", render::cart(&self.symbol, &snapshot));
                Ok(())
            }
            Command::Show => {
                println!("{}", render::cart(&self.symbol, &self.manager.snapshot()));
                Ok(())
            }
            Command::Pay(tendered) => {
                let options = CheckoutOptions {
                    customer_required: self.manager.settings().require_customer,
                    tendered,
                };
                self.manager.checkout_with(options).await.map(|receipt| {
                    let notice =
                        Notice::info(NoticeCode::SaleCompleted, render::receipt(&self.symbol, &receipt));
                    println!("{}", render::notice(&notice));
                })
            }
            Command::Quit => Ok(()),
        };

        if let Err(e) = outcome {
            report(&e);
        }
        Ok(())
    }

    fn show_listing(&mut self, products: Vec<Product>) {
        self.listing = products;
        self.filter = ProductFilter::new();
        self.print_listing();
    }

    fn print_listing(&self) {
        let visible = self.filter.apply(&self.listing);
        println!("{}", render::products(&self.symbol, &visible));
    }

    fn add_from_listing(&self, product_id: ProductId, quantity: i64) -> Result<(), CartError> {
        let Some(product) = self.listing.iter().find(|p| p.id == product_id) else {
            println!("Product {} is not in the last listing", product_id);
            return Ok(());
        };

        let snapshot = self.manager.add_item(product, quantity)?;
        let notice = Notice::info(
            NoticeCode::ItemAdded,
            format!("Added {} x {}", quantity, product.name),
        );
        println!("{}", render::notice(&notice));
        println!("{}", render::cart(&self.symbol, &snapshot));
        Ok(())
    }
}

fn report(err: &CartError) {
    let notice = err.to_notice();
    if err.is_retryable() {
        println!("{} (retry possible)", render::notice(&notice));
    } else {
        println!("{}", render::notice(&notice));
    }
}

async fn confirm(question: &str, lines: &mut Lines<BufReader<Stdin>>) -> std::io::Result<bool> {
    prompt(question).await?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
