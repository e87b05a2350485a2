//! Hosting example: declared services, configuration and the locator.
//!
//! Run with `RUST_LOG=tarkib=debug` to see composition logs, and try
//! overriding a lifetime from the environment:
//! `TARKIB_Services__Calculator__Mode=Singleton`.

use std::sync::Arc;

use tarkib::{
    Composer, ConfigLoader, Injectable, Result, Service, ServiceEntry, ServicesSection,
    TypeCatalog, service_contract,
};
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

// === Service contracts ===

#[service_contract(lifetime = "singleton", implementation = "ConsolePrinter")]
trait Printer: Send + Sync {
    fn print(&self, text: &str);
}

#[service_contract]
trait Calculator: Send + Sync {
    fn add(&self, a: i64, b: i64) -> i64;
}

// === Implementations ===

#[derive(Default, Injectable)]
#[service(implements = "dyn Printer")]
struct ConsolePrinter;

impl Printer for ConsolePrinter {
    fn print(&self, text: &str) {
        println!("🖨  {text}");
    }
}

#[derive(Default, Injectable)]
#[service(implements = "dyn Calculator")]
struct DefaultCalculator;

impl Calculator for DefaultCalculator {
    fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }
}

/// Built per scope; gets its calculator after construction.
#[derive(Service)]
#[service(lifetime = "scoped", constructor = "Self::new", method = "announce")]
struct InvoiceService {
    printer: Arc<dyn Printer>,
    #[inject]
    calculator: Option<Arc<dyn Calculator>>,
}

impl InvoiceService {
    fn new(printer: Arc<dyn Printer>) -> Self {
        Self { printer, calculator: None }
    }

    fn announce(&mut self, printer: Arc<dyn Printer>) {
        printer.print("invoice service ready");
    }

    fn total(&self, lines: &[i64]) -> i64 {
        let Some(calculator) = &self.calculator else {
            return 0;
        };
        lines.iter().fold(0, |sum, line| calculator.add(sum, *line))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tarkib=info")))
        .init();

    // Environment overrides on top of the defaults below.
    let mut section = ServicesSection::new();
    section.insert(
        "Calculator",
        ServiceEntry::new().with_implementation("DefaultCalculator").with_mode("Transient"),
    );
    for (name, entry) in ConfigLoader::new().load()?.entries() {
        section.insert(name, entry.clone());
    }

    let catalog = TypeCatalog::of_crate(module_path!());
    println!("📚 Catalog {:?}: {:?}", catalog.name(), catalog.qualified_names());

    let mut composer = Composer::new();
    composer
        .add_services(&catalog)?
        .add_services_from_configuration_with(&section, &catalog, |declaration| {
            println!(
                "🧩 {} → {:?} ({})",
                declaration.service, declaration.implementation, declaration.lifetime
            );
        })?
        .add_service_locator();
    let composition = composer.build()?;

    // === One scope per unit of work ===
    for request in 1..=2 {
        let _span = info_span!("request", id = request).entered();
        let scope = composition.create_scope();
        let invoice = scope.resolve::<InvoiceService>()?;
        let total = invoice.total(&[12, 30]);
        info!(total, "Invoice computed");
        invoice.printer.print(&format!("request {request}: total {total}"));
    }

    // === By name ===
    println!("🔎 Known services: {:?}", composition.member_names()?);
    if let Some(printer) = composition.locate_as::<dyn Printer>("Printer")? {
        printer.print("found by name");
    }

    println!("\n🎉 Everything works!");
    Ok(())
}
