//! In-memory repository used by the pipeline tests.

use crate::agents::version_control::{TagRef, VersionControl};
use crate::error::{GitpinError, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct FakeCommit {
    parent: Option<String>,
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeHead {
    Branch(String),
    Detached(String),
}

#[derive(Debug, Default)]
struct State {
    commits: BTreeMap<String, FakeCommit>,
    next_id: usize,
    local: BTreeMap<String, String>,
    remote: BTreeMap<String, String>,
    upstreams: BTreeMap<String, String>,
    head: Option<FakeHead>,
    tags: Vec<TagRef>,
    default_branch: Option<String>,
    dirty: bool,
    fetch_error: Option<String>,
    reflog: Vec<String>,
    reads: Vec<(String, String)>,
    maintenance_runs: usize,
}

pub struct FakeRepo {
    root: PathBuf,
    remote_name: String,
    state: RefCell<State>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/srv/app"),
            remote_name: "origin".to_string(),
            state: RefCell::new(State::default()),
        }
    }

    /// Create a commit on top of `parent`, inheriting its files and applying `changes`.
    pub fn commit(&self, parent: Option<&str>, changes: &[(&str, &str)]) -> String {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("c{:03}", state.next_id);

        let mut files = parent
            .and_then(|p| state.commits.get(p))
            .map(|c| c.files.clone())
            .unwrap_or_default();
        for (path, content) in changes {
            files.insert((*path).to_string(), content.as_bytes().to_vec());
        }

        state.commits.insert(
            id.clone(),
            FakeCommit {
                parent: parent.map(str::to_string),
                files,
            },
        );
        id
    }

    /// Append `count` commits that touch nothing tracked; returns the new tip.
    pub fn extend(&self, from: &str, count: usize) -> String {
        let mut tip = from.to_string();
        for i in 0..count {
            let note = format!("change {i} on top of {tip}");
            tip = self.commit(Some(&tip), &[("NOTES.md", note.as_str())]);
        }
        tip
    }

    pub fn set_local_branch(&self, name: &str, commit: &str) {
        self.state
            .borrow_mut()
            .local
            .insert(name.to_string(), commit.to_string());
    }

    pub fn set_remote_branch(&self, name: &str, commit: &str) {
        self.state
            .borrow_mut()
            .remote
            .insert(name.to_string(), commit.to_string());
    }

    pub fn track(&self, local: &str, remote_branch: &str) {
        let upstream = format!("{}/{}", self.remote_name, remote_branch);
        self.state
            .borrow_mut()
            .upstreams
            .insert(local.to_string(), upstream);
    }

    pub fn set_head_branch(&self, name: &str) {
        self.state.borrow_mut().head = Some(FakeHead::Branch(name.to_string()));
    }

    pub fn set_head_detached(&self, commit: &str) {
        self.state.borrow_mut().head = Some(FakeHead::Detached(commit.to_string()));
    }

    pub fn add_tag(&self, name: &str, commit: &str) {
        self.state.borrow_mut().tags.push(TagRef {
            name: name.to_string(),
            target: commit.to_string(),
        });
    }

    pub fn set_default_branch(&self, name: &str) {
        self.state.borrow_mut().default_branch = Some(name.to_string());
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.state.borrow_mut().dirty = dirty;
    }

    pub fn fail_fetch(&self, message: &str) {
        self.state.borrow_mut().fetch_error = Some(message.to_string());
    }

    pub fn head(&self) -> Option<FakeHead> {
        self.state.borrow().head.clone()
    }

    pub fn reflog(&self) -> Vec<String> {
        self.state.borrow().reflog.clone()
    }

    pub fn reads(&self) -> Vec<(String, String)> {
        self.state.borrow().reads.clone()
    }

    pub fn maintenance_runs(&self) -> usize {
        self.state.borrow().maintenance_runs
    }

    /// Commits reachable from `commit` by following parents.
    pub fn ancestry(&self, commit: &str) -> HashSet<String> {
        let state = self.state.borrow();
        Self::ancestors(&state, commit)
    }

    fn ancestors(state: &State, commit: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut cursor = Some(commit.to_string());
        while let Some(id) = cursor {
            if !seen.insert(id.clone()) {
                break;
            }
            cursor = state.commits.get(&id).and_then(|c| c.parent.clone());
        }
        seen
    }

    fn head_id(state: &State) -> Result<String> {
        match &state.head {
            Some(FakeHead::Branch(name)) => state
                .local
                .get(name)
                .cloned()
                .ok_or_else(|| GitpinError::GitOperation(format!("unborn branch {name}"))),
            Some(FakeHead::Detached(id)) => Ok(id.clone()),
            None => Err(GitpinError::GitOperation("HEAD is not set".into())),
        }
    }

    fn resolve(&self, state: &State, reference: &str) -> Result<String> {
        if reference == "HEAD" {
            return Self::head_id(state);
        }
        let prefix = format!("{}/", self.remote_name);
        if let Some(remote_branch) = reference.strip_prefix(&prefix) {
            if let Some(id) = state.remote.get(remote_branch) {
                return Ok(id.clone());
            }
        }
        if let Some(id) = state.local.get(reference) {
            return Ok(id.clone());
        }
        if let Some(tag) = state.tags.iter().find(|t| t.name == reference) {
            return Ok(tag.target.clone());
        }
        if state.commits.contains_key(reference) {
            return Ok(reference.to_string());
        }
        Err(GitpinError::GitOperation(format!(
            "unknown revision '{reference}'"
        )))
    }

    fn move_head(state: &mut State, target: String) {
        match state.head.clone() {
            Some(FakeHead::Branch(name)) => {
                state.local.insert(name, target.clone());
            }
            _ => state.head = Some(FakeHead::Detached(target.clone())),
        }
        state.reflog.push(target);
    }
}

impl VersionControl for FakeRepo {
    fn work_tree(&self) -> &Path {
        &self.root
    }

    fn fetch(&self, _remote: &str) -> Result<()> {
        match &self.state.borrow().fetch_error {
            Some(message) => Err(GitpinError::Network(message.clone())),
            None => Ok(()),
        }
    }

    fn remote_url(&self, _remote: &str) -> Result<Option<String>> {
        Ok(Some("https://example.com/team/app.git".to_string()))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(match &self.state.borrow().head {
            Some(FakeHead::Branch(name)) => Some(name.clone()),
            _ => None,
        })
    }

    fn head_commit(&self) -> Result<String> {
        Self::head_id(&self.state.borrow())
    }

    fn upstream(&self) -> Result<Option<String>> {
        let state = self.state.borrow();
        Ok(match &state.head {
            Some(FakeHead::Branch(name)) => state.upstreams.get(name).cloned(),
            _ => None,
        })
    }

    fn default_branch(&self, _remote: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().default_branch.clone())
    }

    fn ahead_behind(&self, local: &str, remote: &str) -> Result<(usize, usize)> {
        let state = self.state.borrow();
        let local = Self::ancestors(&state, &self.resolve(&state, local)?);
        let remote = Self::ancestors(&state, &self.resolve(&state, remote)?);
        Ok((
            local.difference(&remote).count(),
            remote.difference(&local).count(),
        ))
    }

    fn list_tags(&self) -> Result<Vec<TagRef>> {
        Ok(self.state.borrow().tags.clone())
    }

    fn checkout(&self, branch: &str, force: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.dirty && !force {
            return Err(GitpinError::GitOperation(
                "git checkout failed: Your local changes would be overwritten by checkout".into(),
            ));
        }
        if !state.local.contains_key(branch) {
            let tip = state.remote.get(branch).cloned().ok_or_else(|| {
                GitpinError::GitOperation(format!("pathspec '{branch}' did not match"))
            })?;
            state.local.insert(branch.to_string(), tip);
            let upstream = format!("{}/{}", self.remote_name, branch);
            state.upstreams.insert(branch.to_string(), upstream);
        }
        if force {
            state.dirty = false;
        }
        state.head = Some(FakeHead::Branch(branch.to_string()));
        let id = Self::head_id(&state)?;
        state.reflog.push(id);
        Ok(())
    }

    fn checkout_detached(&self, commit: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.dirty {
            return Err(GitpinError::GitOperation(
                "git checkout --detach failed: Your local changes would be overwritten".into(),
            ));
        }
        let target = self.resolve(&state, commit)?;
        state.head = Some(FakeHead::Detached(target.clone()));
        state.reflog.push(target);
        Ok(())
    }

    fn pull_fast_forward(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let Some(FakeHead::Branch(branch)) = state.head.clone() else {
            return Err(GitpinError::GitOperation(
                "git pull failed: You are not currently on a branch".into(),
            ));
        };
        let upstream = state.upstreams.get(&branch).cloned().ok_or_else(|| {
            GitpinError::GitOperation("git pull failed: no tracking information".into())
        })?;
        let local = Self::head_id(&state)?;
        let remote = self.resolve(&state, &upstream)?;

        if Self::ancestors(&state, &remote).contains(&local) {
            Self::move_head(&mut state, remote);
            Ok(())
        } else if Self::ancestors(&state, &local).contains(&remote) {
            Ok(())
        } else {
            Err(GitpinError::GitOperation(
                "git pull --ff-only failed: Not possible to fast-forward, aborting.".into(),
            ))
        }
    }

    fn reset_hard(&self, reference: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let target = self.resolve(&state, reference)?;
        state.dirty = false;
        Self::move_head(&mut state, target);
        Ok(())
    }

    fn read_file_at(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let mut state = self.state.borrow_mut();
        state.reads.push((commit.to_string(), path.to_string()));
        let commit = state
            .commits
            .get(commit)
            .ok_or_else(|| GitpinError::GitOperation(format!("bad object {commit}")))?;
        Ok(commit.files.get(path).cloned())
    }

    fn maintenance(&self) -> Result<()> {
        self.state.borrow_mut().maintenance_runs += 1;
        Ok(())
    }
}

/// Presenter that replays canned answers and records what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedPresenter {
    answers: std::collections::VecDeque<Option<usize>>,
    pub menus: Vec<(String, Vec<String>)>,
    pub diffs: Vec<(String, String)>,
}

impl ScriptedPresenter {
    pub fn answering(answers: &[Option<usize>]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl crate::agents::presentation::Presenter for ScriptedPresenter {
    fn select(&mut self, prompt: &str, choices: &[String]) -> Result<Option<usize>> {
        self.menus.push((prompt.to_string(), choices.to_vec()));
        Ok(self.answers.pop_front().flatten())
    }

    fn show_diff(&mut self, title: &str, diff: &str) {
        self.diffs.push((title.to_string(), diff.to_string()));
    }
}
