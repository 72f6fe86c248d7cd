use log::info;
use std::sync::Arc;

use crate::{
    config::{Config, WizardConfig},
    modules::{
        capability::{Credentials, SignInProvider, UserIdentity},
        catalog::CategoryCatalog,
        error::WizardError,
        submission_wizard::{ChallengeContext, SubmissionWizard},
    },
};

// Per-visit application state: who is signed in, and the catalog wizards are built from
// Nothing here outlives the process
pub struct AppSession {
    user: Option<UserIdentity>,
    catalog: Arc<CategoryCatalog>,
    wizard_config: WizardConfig,
}

impl AppSession {
    pub fn new(config: &Config) -> Self {
        Self {
            user: None,
            catalog: Arc::new(config.catalog()),
            wizard_config: config.wizard.clone(),
        }
    }

    pub fn current_user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub async fn sign_in(
        &mut self,
        provider: &dyn SignInProvider,
        credentials: &Credentials,
    ) -> Result<&UserIdentity, WizardError> {
        let identity = provider
            .sign_in(credentials)
            .await
            .map_err(WizardError::SignIn)?;
        info!("Signed in as {}", identity.username);
        Ok(self.user.insert(identity))
    }

    pub fn sign_out(&mut self) {
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.username);
        }
    }

    // The wizard is only available to a signed-in user
    pub fn open_wizard(
        &self,
        challenge: Option<ChallengeContext>,
    ) -> Result<SubmissionWizard, WizardError> {
        let user = self.user.as_ref().ok_or(WizardError::NotSignedIn)?;
        Ok(
            SubmissionWizard::new(self.catalog.clone(), self.wizard_config.clone())
                .with_challenge(challenge)
                .with_submitter(Some(user.username.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::submission_wizard::WizardStep;
    use async_trait::async_trait;

    struct StaticProvider;

    #[async_trait]
    impl SignInProvider for StaticProvider {
        async fn sign_in(&self, credentials: &Credentials) -> Result<UserIdentity, String> {
            if credentials.password != "hunter2" {
                return Err("invalid credentials".to_string());
            }
            let username = credentials.email.split('@').next().unwrap_or_default().to_string();
            Ok(UserIdentity {
                username,
                email: credentials.email.clone(),
            })
        }
    }

    fn credentials(password: &str) -> Credentials {
        Credentials {
            email: "ada@example.org".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn wizard_requires_identity() {
        let session = AppSession::new(&Config::default());
        assert!(matches!(session.open_wizard(None), Err(WizardError::NotSignedIn)));
    }

    #[tokio::test]
    async fn signed_in_user_opens_wizard_for_challenge() {
        let mut session = AppSession::new(&Config::default());
        let user = session.sign_in(&StaticProvider, &credentials("hunter2")).await.unwrap();
        assert_eq!(user.username, "ada");

        let challenge = ChallengeContext {
            title: "Cable Cleanup".to_string(),
            points_reward: Some(75),
        };
        let wizard = session.open_wizard(Some(challenge.clone())).unwrap();
        assert_eq!(wizard.step(), WizardStep::CapturingPhotos);
        assert_eq!(wizard.challenge(), Some(&challenge));
        assert_eq!(wizard.catalog().len(), session.catalog().len());
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_session_anonymous() {
        let mut session = AppSession::new(&Config::default());
        let err = session.sign_in(&StaticProvider, &credentials("wrong")).await.unwrap_err();
        assert_eq!(err, WizardError::SignIn("invalid credentials".to_string()));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn sign_out_closes_the_gate() {
        let mut session = AppSession::new(&Config::default());
        session.sign_in(&StaticProvider, &credentials("hunter2")).await.unwrap();
        session.sign_out();
        assert!(session.current_user().is_none());
        assert!(session.open_wizard(None).is_err());
    }
}
