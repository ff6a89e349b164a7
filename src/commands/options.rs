use crate::commands::Out;
use crate::model::Owner;
use crate::{Config, Result};
use serde::{Deserialize, Serialize};

/// The choices offered when adding an entry.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub owners: Vec<Owner>,
    pub categories: Vec<String>,
    pub payment_methods: Vec<String>,
}

/// Lists the configured owners, suggested categories and payment methods.
pub async fn options(config: &Config) -> Result<Out<Options>> {
    let options = Options {
        owners: config.owners().to_vec(),
        categories: config.categories().to_vec(),
        payment_methods: config.payment_methods().to_vec(),
    };
    let owners: Vec<&str> = options.owners.iter().map(Owner::name).collect();
    let message = format!(
        "Owners: {}\nCategories: {}\nPayment methods: {}",
        owners.join(", "),
        options.categories.join(", "),
        options.payment_methods.join(", ")
    );
    Ok(Out::new(message, options))
}
