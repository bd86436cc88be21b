//! Memoization of profile and course records, keyed by semester.
//!
//! The portal client only depends on the [`Cache`] capability. Two variants
//! ship with the crate: [`InMemoryCache`], whose `save` does nothing, and
//! [`JsonFileCache`], which writes the same data to a JSON file.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::json::{read_json_file, write_json_file};
use crate::portal::models::{Course, CourseCode, SemesterId, UNKNOWN_SEMESTER, UserInfo};

pub type CourseBucket = BTreeMap<CourseCode, Course>;

/// Serializable cache contents.
///
/// Invariant: a course code lives in at most one bucket, and
/// `course_to_semester` names exactly that bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheData {
    #[serde(default)]
    pub user_info: Option<UserInfo>,
    #[serde(default)]
    pub courses: BTreeMap<SemesterId, CourseBucket>,
    #[serde(default)]
    pub course_to_semester: BTreeMap<CourseCode, SemesterId>,
}

impl Default for CacheData {
    fn default() -> Self {
        Self {
            user_info: None,
            courses: BTreeMap::from([(UNKNOWN_SEMESTER.to_owned(), CourseBucket::new())]),
            course_to_semester: BTreeMap::new(),
        }
    }
}

#[async_trait]
pub trait Cache: Send {
    fn data(&self) -> &CacheData;
    fn data_mut(&mut self) -> &mut CacheData;

    /// Persists the current contents. No-op unless the variant has a backing store.
    async fn save(&mut self) -> Result<()> {
        Ok(())
    }

    fn user_info(&self) -> Option<&UserInfo> {
        self.data().user_info.as_ref()
    }

    fn set_user_info(&mut self, info: UserInfo) {
        self.data_mut().user_info = Some(info);
    }

    /// Courses of one semester, created empty on first access.
    fn course_bucket(&mut self, semester: &str) -> &mut CourseBucket {
        self.data_mut()
            .courses
            .entry(semester.to_owned())
            .or_default()
    }

    fn semester_for(&self, code: &str) -> Option<&str> {
        self.data().course_to_semester.get(code).map(String::as_str)
    }

    fn set_semester_for(&mut self, code: &str, semester: &str) {
        self.data_mut()
            .course_to_semester
            .insert(code.to_owned(), semester.to_owned());
    }

    /// Looks a course up through the code index, then its bucket.
    fn course(&self, code: &str) -> Option<&Course> {
        let semester = self.semester_for(code)?;
        self.data().courses.get(semester)?.get(code)
    }

    /// Files `course` under `semester`, removing it from whichever bucket held it before.
    fn assign_course(&mut self, semester: &str, course: Course) {
        let code = course.code.clone();
        let previous = self.semester_for(&code).map(str::to_owned);
        if let Some(previous) = previous.filter(|p| p != semester)
            && let Some(bucket) = self.data_mut().courses.get_mut(&previous)
        {
            bucket.remove(&code);
        }
        self.course_bucket(semester).insert(code.clone(), course);
        self.set_semester_for(&code, semester);
    }
}

/// Cache that lives only as long as the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryCache {
    data: CacheData,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: CacheData) -> Self {
        Self { data }
    }
}

impl Cache for InMemoryCache {
    fn data(&self) -> &CacheData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut CacheData {
        &mut self.data
    }
}

/// Cache persisted as pretty-printed JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
    data: CacheData,
}

impl JsonFileCache {
    /// Loads `path` if it exists, otherwise starts empty.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = read_json_file(&path)
            .await
            .context("Failed to load course cache")?
            .unwrap_or_default();
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Cache for JsonFileCache {
    fn data(&self) -> &CacheData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut CacheData {
        &mut self.data
    }

    async fn save(&mut self) -> Result<()> {
        write_json_file(&self.path, &self.data).await?;
        debug!(path = %self.path.display(), "cache saved");
        Ok(())
    }
}
