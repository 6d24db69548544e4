//! Organization command handlers.

use meraki_api::models::Organization;
use tabled::Tabled;

use crate::cli::{GlobalOpts, OrgsArgs, OrgsCommand};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct OrgRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "API")]
    api: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl From<&Organization> for OrgRow {
    fn from(o: &Organization) -> Self {
        Self {
            id: o.id.clone(),
            name: o.name.clone(),
            api: match o.api {
                Some(ref api) if api.enabled => "enabled".into(),
                Some(_) => "disabled".into(),
                None => "-".into(),
            },
            url: util::or_dash(o.url.as_deref()),
        }
    }
}

pub async fn handle(
    profile: &ResolvedProfile,
    args: OrgsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        OrgsCommand::List => {
            let schema = profile.schema()?;
            let client = meraki_core::build_client(&schema, &profile.transport)?;
            let orgs = client
                .get_organizations()
                .await
                .map_err(|e| CliError::from(e).for_profile(&profile.name))?;
            let out =
                output::render_list(global.output, &orgs, |o| OrgRow::from(o), |o| o.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
