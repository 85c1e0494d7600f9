//! Embedded Terraform templates.

use thiserror::Error;

use crate::lb::LbType;
use crate::state::Iaas;

/// GCP network, subnetwork, firewall, and jumpbox template.
pub const GCP_BASE_TEMPLATE: &str = include_str!("templates/gcp_base.tf");

/// GCP Concourse load balancer resources, appended to the base template.
pub const GCP_CONCOURSE_LB_TEMPLATE: &str = include_str!("templates/gcp_concourse_lb.tf");

const TEMPLATE_SEPARATOR: &str = "\n\n";

/// Errors raised while selecting a template.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TemplateError {
    /// No templates are bundled for this provider.
    #[error("no terraform templates are available for {0}")]
    UnsupportedIaas(Iaas),
    /// No LB template is bundled for this provider.
    #[error("no {lb_type} load balancer template is available for {iaas}")]
    UnsupportedLb {
        /// Provider the template was requested for.
        iaas: Iaas,
        /// Requested LB type.
        lb_type: LbType,
    },
}

/// Chooses the template text for a provider and optional LB type.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateSelector;

impl TemplateSelector {
    /// Returns the base template for `iaas`, followed by the LB resources
    /// when `lb_type` is set.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when no template is bundled for the pair.
    pub fn select(self, iaas: Iaas, lb_type: Option<LbType>) -> Result<String, TemplateError> {
        let base = match iaas {
            Iaas::Gcp => GCP_BASE_TEMPLATE,
            Iaas::Aws | Iaas::Azure => return Err(TemplateError::UnsupportedIaas(iaas)),
        };
        let Some(lb) = lb_type else {
            return Ok(base.to_owned());
        };
        let lb_template = match (iaas, lb) {
            (Iaas::Gcp, LbType::Concourse) => GCP_CONCOURSE_LB_TEMPLATE,
            (Iaas::Aws | Iaas::Azure, _) => {
                return Err(TemplateError::UnsupportedLb { iaas, lb_type: lb });
            }
        };
        Ok([base, lb_template].join(TEMPLATE_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EXPECTED_CONCOURSE: &str =
        include_str!("../../tests/fixtures/gcp_concourse_template.tf");

    #[rstest]
    fn gcp_concourse_template_matches_fixture() {
        let template = TemplateSelector
            .select(Iaas::Gcp, Some(LbType::Concourse))
            .expect("template");
        assert_eq!(template, EXPECTED_CONCOURSE);
    }

    #[rstest]
    fn gcp_without_lb_is_base_only() {
        let template = TemplateSelector.select(Iaas::Gcp, None).expect("template");
        assert_eq!(template, GCP_BASE_TEMPLATE);
        assert!(!template.contains("google_compute_target_pool"));
    }

    #[rstest]
    #[case(Iaas::Aws)]
    #[case(Iaas::Azure)]
    fn other_providers_have_no_templates(#[case] iaas: Iaas) {
        assert_eq!(
            TemplateSelector.select(iaas, Some(LbType::Concourse)),
            Err(TemplateError::UnsupportedIaas(iaas))
        );
    }
}
