use url::Url;

use crate::types::push::{NotificationAction, NotificationPayload};

/// Attribution context attached when the caller does not supply one.
pub const DEFAULT_CONTEXT: &str = "push";

/// Pure construction of canonical notification payloads from typed domain
/// events. No lookups, no I/O: callers pass in every display string.
#[derive(Debug, Clone)]
pub struct NotificationComposer {
    base_url: Url,
}

impl NotificationComposer {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// A lead finished processing and is ready for review. The tag collapses
    /// repeated notifications about the same lead into one tray entry.
    #[must_use]
    pub fn lead_ready(
        &self,
        list_id: &str,
        lead_id: &str,
        lead_name: &str,
        context: Option<&str>,
    ) -> NotificationPayload {
        let context = context.unwrap_or(DEFAULT_CONTEXT);
        let mut url = self.base_url.clone();
        url.set_path(&format!("/lists/{list_id}/leads/{lead_id}"));
        url.query_pairs_mut().clear().append_pair("context", context);

        NotificationPayload {
            title: "Lead ready".to_string(),
            body: format!("{lead_name} is ready for review"),
            url: url.to_string(),
            tag: format!("lead-{lead_id}"),
            icon: None,
            badge: None,
            require_interaction: None,
            data: Some(serde_json::json!({
                "entity": "lead",
                "context": context,
                "listId": list_id,
                "leadId": lead_id,
            })),
            actions: vec![NotificationAction {
                action: "open".to_string(),
                title: "View lead".to_string(),
                icon: None,
            }],
        }
    }

    /// Progress on a campaign. Deep-links to the campaigns listing filtered
    /// by id unless the caller supplies an explicit results path.
    #[must_use]
    pub fn campaign_update(
        &self,
        campaign_id: &str,
        campaign_name: &str,
        context: Option<&str>,
        results_path: Option<&str>,
    ) -> NotificationPayload {
        let context = context.unwrap_or(DEFAULT_CONTEXT);
        let mut url = self.base_url.clone();
        match results_path {
            Some(path) => {
                url.set_path(path);
                url.set_query(None);
            }
            None => {
                url.set_path("/campaigns");
                url.query_pairs_mut()
                    .clear()
                    .append_pair("campaignId", campaign_id);
            }
        }

        NotificationPayload {
            title: "Campaign update".to_string(),
            body: format!("{campaign_name} has new results"),
            url: url.to_string(),
            tag: format!("campaign-{campaign_id}"),
            icon: None,
            badge: None,
            require_interaction: None,
            data: Some(serde_json::json!({
                "entity": "campaign",
                "context": context,
                "campaignId": campaign_id,
            })),
            actions: vec![NotificationAction {
                action: "open".to_string(),
                title: "View results".to_string(),
                icon: None,
            }],
        }
    }
}
