use std::str::FromStr;

/// Number of whitespace-separated columns in a workload line.
pub const NUM_FIELDS: usize = 18;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("expected 18 fields, found {found}")]
    WrongNumberOfFields { found: usize },
    #[error("field {column} is not an integer: {value:?}")]
    BadField { column: usize, value: String },
}

/// One line of a workload file, with the archive's field names.
///
/// All 18 columns are parsed eagerly; consumers pick the subset they care
/// about. Fields that the archive marks "unknown" hold `-1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub number: i64,
    pub submit_time: i64,
    pub wait_time: i64,
    pub run_time: i64,
    pub num_allocated_processors: i64,
    pub average_cpu_time_used: i64,
    pub used_memory: i64,
    pub num_requested_processors: i64,
    pub requested_time: i64,
    pub requested_memory: i64,
    pub status: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub executable_number: i64,
    pub queue_number: i64,
    pub partition_number: i64,
    pub preceding_job_number: i64,
    pub think_time_from_preceding_job: i64,
}

impl Record {
    /// The processor demand of the job: the requested count, or the
    /// allocated count when the request column is unknown. The larger of
    /// the two wins when both are present.
    pub fn required_processors(&self) -> i64 {
        self.num_requested_processors.max(self.num_allocated_processors)
    }

    /// The archive rules for lines that carry no usable job: partial or
    /// checkpointed executions (status 2, 3, 4), jobs with no arrival and
    /// no dependency, and jobs with nonsensical ids, times or sizes.
    pub fn should_skip(&self) -> bool {
        matches!(self.status, 2 | 3 | 4)
            || (self.submit_time == -1 && self.preceding_job_number == -1)
            || self.number < 1
            || self.user_id < 0
            || self.group_id < 0
            || self.submit_time <= 0
            || self.run_time <= 0
            || self.required_processors() <= 0
    }
}

impl FromStr for Record {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = [0i64; NUM_FIELDS];
        let mut count = 0;
        for (column, raw) in s.split_whitespace().enumerate() {
            if column >= NUM_FIELDS {
                count += 1;
                continue;
            }
            fields[column] = raw.parse().map_err(|_| RecordError::BadField {
                column,
                value: raw.to_owned(),
            })?;
            count += 1;
        }
        if count != NUM_FIELDS {
            return Err(RecordError::WrongNumberOfFields { found: count });
        }

        Ok(Record {
            number: fields[0],
            submit_time: fields[1],
            wait_time: fields[2],
            run_time: fields[3],
            num_allocated_processors: fields[4],
            average_cpu_time_used: fields[5],
            used_memory: fields[6],
            num_requested_processors: fields[7],
            requested_time: fields[8],
            requested_memory: fields[9],
            status: fields[10],
            user_id: fields[11],
            group_id: fields[12],
            executable_number: fields[13],
            queue_number: fields[14],
            partition_number: fields[15],
            preceding_job_number: fields[16],
            think_time_from_preceding_job: fields[17],
        })
    }
}
