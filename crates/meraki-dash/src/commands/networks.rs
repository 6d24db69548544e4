//! Network command handlers.

use meraki_api::models::Network;
use tabled::Tabled;

use crate::cli::{GlobalOpts, NetworksArgs, NetworksCommand};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Products")]
    products: String,
    #[tabled(rename = "Time Zone")]
    time_zone: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<&Network> for NetworkRow {
    fn from(n: &Network) -> Self {
        Self {
            id: n.id.clone(),
            name: n.name.clone(),
            products: n.product_types.join(", "),
            time_zone: util::or_dash(n.time_zone.as_deref()),
            tags: n.tags.join(", "),
        }
    }
}

pub async fn handle(
    profile: &ResolvedProfile,
    args: NetworksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        NetworksCommand::List => {
            let session = util::connect(profile).await?;
            let mut networks = session
                .client
                .get_organization_networks(&session.org_id)
                .await?;
            networks.sort_by(|a, b| a.name.cmp(&b.name));
            let out = output::render_list(
                global.output,
                &networks,
                |n| NetworkRow::from(n),
                |n| n.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
