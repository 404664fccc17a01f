use std::future::Future;

use smol_str::SmolStr;

use crate::error::DiagramError;
use crate::tree::NodeId;

/// A placeholder handed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Stable identity of the placeholder.
    pub key: SmolStr,
    /// The placeholder node at submission time. Checked for liveness before
    /// mounting.
    pub node: NodeId,
    /// Id for the generated graphic, `{placeholder id}-svg`.
    pub render_id: String,
    pub definition: String,
}

/// Turns a diagram definition into SVG markup.
pub trait DiagramCompiler {
    fn compile(
        &self,
        render_id: &str,
        definition: &str,
    ) -> impl Future<Output = Result<String, DiagramError>>;
}

/// Compile a batch concurrently, pairing each job with its result.
pub async fn compile_all<C: DiagramCompiler + ?Sized>(
    compiler: &C,
    jobs: Vec<CompileJob>,
) -> Vec<(CompileJob, Result<String, DiagramError>)> {
    let results = n0_future::join_all(
        jobs.iter()
            .map(|job| compiler.compile(&job.render_id, &job.definition)),
    )
    .await;
    jobs.into_iter().zip(results).collect()
}
