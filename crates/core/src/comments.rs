//! Review comment bodies posted for a run.

/// Posted when a run is enqueued from a pull request.
pub fn in_progress_comment(dashboard_link: &str) -> String {
    format!(
        "🚀 **Benchmark Run Triggered!** 🚀\n\n\
         Your benchmark run has been queued. Spinning up the machines and \
         preparing the environment can take a while.\n\n\
         🔗 [View Results on Grafana]({dashboard_link})\n\n\
         This comment will be updated when the run completes. 📊"
    )
}

/// Posted when the provisioner finished successfully.
pub fn success_comment(dashboard_link: &str, output: &str) -> String {
    format!(
        "✅ **Benchmark Run Completed Successfully!** ✅\n\n\
         🔗 [View Results on Grafana]({dashboard_link})\n\n\
         **Summary:**\n\
         ```\n\
         {output}\n\
         ```"
    )
}

/// Posted when the run failed and produced output worth showing.
pub fn failure_comment(dashboard_link: &str, output: &str) -> String {
    format!(
        "❌ **Benchmark Run Failed!** ❌\n\n\
         🔗 [View Results on Grafana]({dashboard_link})\n\n\
         **Summary:**\n\
         ```\n\
         {output}\n\
         ```"
    )
}

/// Posted when the run failed without any captured output.
pub fn generic_failure_comment() -> String {
    "❌ **Something Went Wrong!** ❌\n\n\
     Please check the terraform and benchyard logs for more details and \
     contact an admin to find out what happened."
        .to_string()
}
