/// Construction of every `az` invocation xks makes
use std::fmt;
use std::sync::Arc;

use super::cluster::LifecycleAction;
use super::scanner::FileReferenceScanner;
use crate::config::ClusterIdentity;
use crate::error::XksError;

/// Flags shared by `command invoke` and `command result`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// `--output` format (json, table, yaml, tsv)
    pub output: Option<String>,
    /// `--subscription` override
    pub subscription: Option<String>,
    pub debug: bool,
    /// `--only-show-errors`
    pub only_errors: bool,
    /// `--query` JMESPath expression
    pub query: Option<String>,
}

/// One remote command requested by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Full command text; takes precedence over `args`
    pub command: Option<String>,
    /// Command words, joined with spaces when `command` is absent
    pub args: Vec<String>,
    /// Explicit attachments; disables file detection when non-empty
    pub files: Vec<String>,
    pub no_wait: bool,
    pub options: CommandOptions,
}

impl CommandSpec {
    /// The command line that will run inside the cluster
    pub fn command_text(&self) -> Result<String, XksError> {
        let text = match &self.command {
            Some(command) if !command.trim().is_empty() => command.clone(),
            _ => self.args.join(" "),
        };

        if text.trim().is_empty() {
            return Err(XksError::InvalidSpec("no command provided"));
        }
        Ok(text)
    }
}

/// Ordered arguments for one `az` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationArgs(Vec<String>);

impl InvocationArgs {
    fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    fn flag(&mut self, name: &str) {
        self.0.push(name.to_string());
    }

    fn value(&mut self, name: &str, value: impl Into<String>) {
        self.0.push(name.to_string());
        self.0.push(value.into());
    }

    fn optional(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.value(name, value);
        }
    }

    fn options(&mut self, options: &CommandOptions) {
        self.optional("--output", options.output.as_deref());
        self.optional("--subscription", options.subscription.as_deref());
        if options.debug {
            self.flag("--debug");
        }
        if options.only_errors {
            self.flag("--only-show-errors");
        }
        self.optional("--query", options.query.as_deref());
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
impl InvocationArgs {
    /// Value following `name`, if present
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .position(|a| a == name)
            .and_then(|i| self.0.get(i + 1))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|a| a == name)
    }
}

/// Renders as `az <args>` with the service principal secret masked
impl fmt::Display for InvocationArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "az")?;
        let mut redact_next = false;
        for arg in &self.0 {
            if redact_next {
                write!(f, " ****")?;
            } else {
                write!(f, " {}", arg)?;
            }
            redact_next = arg == "--password";
        }
        Ok(())
    }
}

/// Builds invocations for a fixed cluster identity
#[derive(Clone)]
pub struct InvocationBuilder {
    identity: ClusterIdentity,
    scanner: Arc<FileReferenceScanner>,
}

impl InvocationBuilder {
    pub fn new(identity: ClusterIdentity, scanner: FileReferenceScanner) -> Self {
        Self {
            identity,
            scanner: Arc::new(scanner),
        }
    }

    pub fn identity(&self) -> &ClusterIdentity {
        &self.identity
    }

    /// `aks command <verb> --resource-group <rg> --name <cluster>`
    fn command_prefix(&self, verb: &str) -> InvocationArgs {
        InvocationArgs::new([
            "aks",
            "command",
            verb,
            "--resource-group",
            &self.identity.resource_group,
            "--name",
            &self.identity.cluster_name,
        ])
    }

    /// `az aks command invoke` for a remote command
    pub fn build(&self, spec: &CommandSpec) -> Result<InvocationArgs, XksError> {
        let command = spec.command_text()?;
        let mut args = self.command_prefix("invoke");
        args.value("--command", command.as_str());

        let explicit: Vec<&str> = spec
            .files
            .iter()
            .map(String::as_str)
            .filter(|f| !f.is_empty())
            .collect();
        if !explicit.is_empty() {
            args.value("--file", explicit.join(","));
        } else {
            let detected = self.scanner.scan(&command);
            if !detected.is_empty() {
                args.value("--file", detected.join(","));
            }
        }

        if spec.no_wait {
            args.flag("--no-wait");
        }
        args.options(&spec.options);

        Ok(args)
    }

    /// `az aks command result` for an earlier `--no-wait` command
    pub fn build_result_query(
        &self,
        command_id: &str,
        options: &CommandOptions,
    ) -> Result<InvocationArgs, XksError> {
        if command_id.trim().is_empty() {
            return Err(XksError::InvalidSpec("a command id is required"));
        }

        let mut args = self.command_prefix("result");
        args.value("--command-id", command_id);
        args.options(options);
        Ok(args)
    }

    /// Cheap read that only succeeds for a logged-in identity
    pub fn auth_probe(&self) -> InvocationArgs {
        InvocationArgs::new([
            "aks",
            "show",
            "--name",
            &self.identity.cluster_name,
            "--resource-group",
            &self.identity.resource_group,
            "--output",
            "none",
        ])
    }

    pub fn login(&self) -> InvocationArgs {
        InvocationArgs::new([
            "login",
            "--service-principal",
            "--username",
            &self.identity.app_id,
            "--password",
            &self.identity.secret,
            "--tenant",
            &self.identity.tenant_id,
            "--output",
            "none",
        ])
    }

    pub fn set_subscription(&self) -> InvocationArgs {
        InvocationArgs::new([
            "account",
            "set",
            "--subscription",
            &self.identity.subscription,
        ])
    }

    /// Merge cluster credentials into the local kubeconfig, replacing entries
    pub fn get_credentials(&self) -> InvocationArgs {
        InvocationArgs::new([
            "aks",
            "get-credentials",
            "--resource-group",
            &self.identity.resource_group,
            "--name",
            &self.identity.cluster_name,
            "--overwrite-existing",
        ])
    }

    pub fn power_state(&self) -> InvocationArgs {
        InvocationArgs::new([
            "aks",
            "show",
            "--name",
            &self.identity.cluster_name,
            "--resource-group",
            &self.identity.resource_group,
            "--subscription",
            &self.identity.subscription,
            "--query",
            "powerState",
            "--output",
            "json",
        ])
    }

    /// `az aks start` or `az aks stop`
    pub fn lifecycle(&self, action: LifecycleAction) -> InvocationArgs {
        InvocationArgs::new([
            "aks",
            action.verb(),
            "--name",
            &self.identity.cluster_name,
            "--resource-group",
            &self.identity.resource_group,
            "--subscription",
            &self.identity.subscription,
        ])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn identity() -> ClusterIdentity {
        ClusterIdentity {
            tenant_id: "tenant".to_string(),
            app_id: "app-id".to_string(),
            secret: "s3cr3t".to_string(),
            subscription: "sub".to_string(),
            resource_group: "rg".to_string(),
            cluster_name: "aks".to_string(),
        }
    }

    pub(crate) fn builder() -> InvocationBuilder {
        InvocationBuilder::new(
            identity(),
            FileReferenceScanner::with_default_rules().unwrap(),
        )
    }

    fn spec(command: &str) -> CommandSpec {
        CommandSpec {
            command: Some(command.to_string()),
            ..CommandSpec::default()
        }
    }

    #[test]
    fn test_minimal_invocation() {
        let args = builder().build(&spec("kubectl get pods")).unwrap();
        assert_eq!(
            args.as_slice(),
            [
                "aks",
                "command",
                "invoke",
                "--resource-group",
                "rg",
                "--name",
                "aks",
                "--command",
                "kubectl get pods"
            ]
        );
        assert!(!args.contains("--no-wait"));
        assert!(!args.contains("--output"));
        assert!(!args.contains("--file"));
    }

    #[test]
    fn test_args_are_joined_when_no_command_text() {
        let spec = CommandSpec {
            args: vec!["kubectl".into(), "get".into(), "ns".into()],
            ..CommandSpec::default()
        };
        let args = builder().build(&spec).unwrap();
        assert_eq!(args.value_of("--command"), Some("kubectl get ns"));
    }

    #[test]
    fn test_empty_spec_is_rejected() {
        let err = builder().build(&CommandSpec::default()).unwrap_err();
        assert!(matches!(err, XksError::InvalidSpec(_)));

        let blank = CommandSpec {
            command: Some("   ".to_string()),
            args: vec![],
            ..CommandSpec::default()
        };
        assert!(matches!(
            builder().build(&blank),
            Err(XksError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_explicit_files_skip_detection() {
        let spec = CommandSpec {
            files: vec!["a.yaml".into(), "dir".into()],
            ..spec("kubectl apply -f Cargo.toml")
        };
        let args = builder().build(&spec).unwrap();
        assert_eq!(args.value_of("--file"), Some("a.yaml,dir"));
    }

    #[test]
    fn test_detected_files_are_attached() {
        // cargo runs unit tests from the crate root
        let args = builder()
            .build(&spec("kubectl apply -f Cargo.toml -f does-not-exist.yaml"))
            .unwrap();
        assert_eq!(args.value_of("--file"), Some("Cargo.toml"));
    }

    #[test]
    fn test_local_helm_chart_is_attached() {
        let args = builder()
            .build(&spec("helm install myrelease ./src --namespace apps"))
            .unwrap();
        assert_eq!(
            args.value_of("--command"),
            Some("helm install myrelease ./src --namespace apps")
        );
        assert_eq!(args.value_of("--file"), Some("./src"));
    }

    #[test]
    fn test_optional_flags_order() {
        let spec = CommandSpec {
            no_wait: true,
            options: CommandOptions {
                output: Some("json".into()),
                subscription: Some("other".into()),
                debug: true,
                only_errors: true,
                query: Some("logs".into()),
            },
            ..spec("kubectl get pods")
        };
        let args = builder().build(&spec).unwrap();
        assert_eq!(
            &args.as_slice()[9..],
            [
                "--no-wait",
                "--output",
                "json",
                "--subscription",
                "other",
                "--debug",
                "--only-show-errors",
                "--query",
                "logs"
            ]
        );
        assert_eq!(builder().build(&spec).unwrap(), args);
    }

    #[test]
    fn test_empty_option_values_are_omitted() {
        let spec = CommandSpec {
            options: CommandOptions {
                output: Some(String::new()),
                query: Some(String::new()),
                ..CommandOptions::default()
            },
            ..spec("kubectl get pods")
        };
        let args = builder().build(&spec).unwrap();
        assert!(!args.contains("--output"));
        assert!(!args.contains("--query"));
    }

    #[test]
    fn test_result_query() {
        let options = CommandOptions {
            output: Some("table".into()),
            ..CommandOptions::default()
        };
        let args = builder().build_result_query("abc123", &options).unwrap();
        assert_eq!(
            args.as_slice(),
            [
                "aks",
                "command",
                "result",
                "--resource-group",
                "rg",
                "--name",
                "aks",
                "--command-id",
                "abc123",
                "--output",
                "table"
            ]
        );
        assert!(matches!(
            builder().build_result_query("", &options),
            Err(XksError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_display_redacts_password() {
        let rendered = builder().login().to_string();
        assert!(rendered.starts_with("az login --service-principal --username app-id"));
        assert!(rendered.contains("--password ****"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn test_lifecycle_and_power_state() {
        let b = builder();
        assert_eq!(
            b.lifecycle(LifecycleAction::Stop).to_string(),
            "az aks stop --name aks --resource-group rg --subscription sub"
        );
        assert_eq!(b.power_state().value_of("--query"), Some("powerState"));
        assert!(b.get_credentials().contains("--overwrite-existing"));
        assert_eq!(b.set_subscription().value_of("--subscription"), Some("sub"));
    }
}
