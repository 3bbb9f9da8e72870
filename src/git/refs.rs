use std::sync::Arc;

use crate::error::{GitError, Result};
use crate::git::command::GitCommand;
use crate::git::history::parse_timestamp;
use crate::git::repository::Repository;
use crate::models::{Commit, Signature, Tag, TagKind};

const TAG_FORMAT: &str = "--format=%(refname)%00%(objectname)%00%(objecttype)%00%(*objectname)%00%(taggername)%00%(taggeremail)%00%(taggerdate:unix)%00%(contents)%00";
// Each record ends in NUL + newline since annotated messages span lines.
const RECORD_END: &str = "\0\n";
const TAG_FIELDS: usize = 8;

fn parse_tag_record(name: &str, record: &str) -> Result<Tag> {
    let fields: Vec<&str> = record.splitn(TAG_FIELDS, '\0').collect();
    let [_refname, id, object_type, peeled, tagger, email, date, contents] = fields[..] else {
        return Err(GitError::Parse(format!(
            "expected {} tag fields, got {}",
            TAG_FIELDS,
            fields.len()
        )));
    };

    let tag = if object_type == "tag" {
        let tagger = if tagger.is_empty() {
            None
        } else {
            Some(Signature {
                name: tagger.to_string(),
                email: email.trim_matches(|c| c == '<' || c == '>').to_string(),
                when: parse_timestamp(date, "tagger")?,
            })
        };
        Tag {
            name: name.to_string(),
            id: id.to_string(),
            kind: TagKind::Annotated,
            target: peeled.to_string(),
            tagger,
            message: Some(contents.trim_end_matches('\n').to_string()),
        }
    } else {
        Tag {
            name: name.to_string(),
            id: id.to_string(),
            kind: TagKind::Lightweight,
            target: id.to_string(),
            tagger: None,
            message: None,
        }
    };
    Ok(tag)
}

impl Repository {
    /// Look up a tag by name. Results are cached per name.
    pub async fn get_tag(&self, name: &str) -> Result<Arc<Tag>> {
        if let Some(tag) = self.tag_cache.get(name) {
            return Ok(tag);
        }

        let refname = format!("refs/tags/{}", name);
        let cmd = GitCommand::new("for-each-ref", [TAG_FORMAT, refname.as_str()]);
        let out = self.run(&cmd).await?;

        // for-each-ref matches by prefix, so `v1` would also list `v1/rc`.
        let record = out
            .split(RECORD_END)
            .find(|record| record.split('\0').next() == Some(refname.as_str()));
        let Some(record) = record else {
            return Err(GitError::ObjectNotFound {
                kind: "tag",
                id: name.to_string(),
            });
        };

        let tag = parse_tag_record(name, record)?;
        Ok(self.tag_cache.insert(name, tag))
    }

    /// Commit a tag points at, peeling annotated tags.
    pub async fn tag_commit(&self, name: &str) -> Result<Arc<Commit>> {
        let tag = self.get_tag(name).await?;
        self.get_commit(&tag.target).await
    }

    pub async fn branches(&self) -> Result<Vec<String>> {
        self.ref_names("refs/heads/").await
    }

    pub async fn tags(&self) -> Result<Vec<String>> {
        self.ref_names("refs/tags/").await
    }

    pub async fn has_branch(&self, name: &str) -> Result<bool> {
        self.has_ref(&format!("refs/heads/{}", name)).await
    }

    pub async fn has_tag(&self, name: &str) -> Result<bool> {
        self.has_ref(&format!("refs/tags/{}", name)).await
    }

    async fn ref_names(&self, prefix: &str) -> Result<Vec<String>> {
        let cmd = GitCommand::new("for-each-ref", ["--format=%(refname:strip=2)", prefix]);
        let out = self.run(&cmd).await?;
        Ok(out
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn has_ref(&self, refname: &str) -> Result<bool> {
        let cmd = GitCommand::new("show-ref", ["--verify", "--quiet", refname]);
        match self.run(&cmd).await {
            Ok(_) => Ok(true),
            Err(GitError::CommandFailed { code: Some(1), .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::testing::FakeRunner;
    use tempfile::TempDir;

    const TAG_ID: &str = "4444444444444444444444444444444444444444";
    const COMMIT_ID: &str = "5555555555555555555555555555555555555555";

    fn setup() -> (TempDir, Arc<FakeRunner>, Repository) {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let repo = Repository::open(temp.path(), runner.clone()).unwrap();
        (temp, runner, repo)
    }

    #[tokio::test]
    async fn annotated_tag_is_parsed_and_cached() {
        let (_temp, runner, repo) = setup();
        runner.push_ok(format!(
            "refs/tags/v1.0\0{TAG_ID}\0tag\0{COMMIT_ID}\0Ada\0<ada@example.com>\01700000000\0Release 1.0\n\nNotes\n\n\0\n"
        ));

        let tag = repo.get_tag("v1.0").await.unwrap();
        assert_eq!(tag.kind, TagKind::Annotated);
        assert_eq!(tag.id, TAG_ID);
        assert_eq!(tag.target, COMMIT_ID);
        assert_eq!(tag.message.as_deref(), Some("Release 1.0\n\nNotes"));
        let tagger = tag.tagger.as_ref().unwrap();
        assert_eq!(tagger.email, "ada@example.com");

        repo.get_tag("v1.0").await.unwrap();
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn lightweight_tag_targets_its_commit() {
        let (_temp, runner, repo) = setup();
        runner.push_ok(format!("refs/tags/v2\0{COMMIT_ID}\0commit\0\0\0\0\0\0\n"));

        let tag = repo.get_tag("v2").await.unwrap();
        assert_eq!(tag.kind, TagKind::Lightweight);
        assert_eq!(tag.target, COMMIT_ID);
        assert!(tag.tagger.is_none());
    }

    #[tokio::test]
    async fn prefix_matches_do_not_count() {
        let (_temp, runner, repo) = setup();
        runner.push_ok(format!("refs/tags/v1/rc\0{COMMIT_ID}\0commit\0\0\0\0\0\0\n"));

        let err = repo.get_tag("v1").await.unwrap_err();
        assert!(matches!(err, GitError::ObjectNotFound { kind: "tag", .. }));
    }

    #[tokio::test]
    async fn missing_ref_is_false_not_error() {
        let (_temp, runner, repo) = setup();
        runner.push_err(GitError::CommandFailed {
            command: "git show-ref".to_string(),
            code: Some(1),
            stderr: String::new(),
        });

        assert!(!repo.has_branch("nope").await.unwrap());
        assert!(repo.has_branch("main").await.unwrap());
        assert_eq!(
            runner.commands(),
            vec![
                "git show-ref --verify --quiet refs/heads/nope",
                "git show-ref --verify --quiet refs/heads/main",
            ]
        );
    }

    #[tokio::test]
    async fn lists_branch_names() {
        let (_temp, runner, repo) = setup();
        runner.push_ok("feature/x\nmain\n");

        assert_eq!(repo.branches().await.unwrap(), vec!["feature/x", "main"]);
    }
}
