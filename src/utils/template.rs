//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const SUBSCRIPTION_ID: &'static str = "subscriptionId";
    pub const TENANT_ID: &'static str = "tenantId";
    pub const RESOURCE_GROUP: &'static str = "resourceGroup";
    pub const STORAGE_ACCOUNT: &'static str = "storageAccount";
    pub const WORKSPACE: &'static str = "workspace";
}

/// Replace every `{{key}}` placeholder. Unknown placeholders are left as-is.
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}
