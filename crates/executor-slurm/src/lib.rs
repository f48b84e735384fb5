mod slurm_executor;

pub use slurm_executor::{parse_job_id, parse_sacct, SlurmExecutor, DEFAULT_SACCT_FORMAT};
