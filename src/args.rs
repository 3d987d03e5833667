/// Separation of xks flags from the forwarded kubectl/helm command

/// Subcommands that are never forwarded
const LIFECYCLE_VERBS: [&str; 4] = ["start", "stop", "status", "init"];

/// Tools whose invocation marks the start of the forwarded command
const FORWARDED_TOOLS: [&str; 2] = ["kubectl", "helm"];

/// Rewrite `argv` (including the program name) for clap
///
/// `xks -o json kubectl get pods -o wide` must hand `kubectl get pods -o wide`
/// to the cluster untouched, so everything from the first `kubectl` or `helm`
/// word onwards is folded into a single `--command` value.
pub fn split_forwarded(argv: Vec<String>) -> Vec<String> {
    let mut iter = argv.into_iter();
    let program = iter.next().unwrap_or_else(|| "xks".to_string());
    let rest: Vec<String> = iter.collect();

    let mut rewritten = vec![program];

    if rest
        .first()
        .is_some_and(|first| LIFECYCLE_VERBS.contains(&first.as_str()))
    {
        rewritten.extend(rest);
        return rewritten;
    }

    match rest
        .iter()
        .position(|arg| FORWARDED_TOOLS.contains(&arg.as_str()))
    {
        Some(index) => {
            let (own, forwarded) = rest.split_at(index);
            rewritten.extend(own.iter().cloned());
            rewritten.push("--command".to_string());
            rewritten.push(forwarded.join(" "));
        }
        None => rewritten.extend(rest),
    }

    rewritten
}
