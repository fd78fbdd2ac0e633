use serde::Deserialize;

/// Envelope every Codeforces API method responds with.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfUserInfo {
    pub handle: String,
    pub rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub rank: Option<String>,
    pub max_rank: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfProblem {
    pub contest_id: Option<i32>,
    pub index: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ProblemsetResult {
    pub problems: Vec<CfProblem>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_user_info_response() {
        let body = r#"{
            "status": "OK",
            "result": [{
                "handle": "tourist",
                "rating": 3775,
                "maxRating": 4009,
                "rank": "legendary grandmaster",
                "maxRank": "tourist",
                "friendOfCount": 60000
            }]
        }"#;

        let response: ApiResponse<Vec<CfUserInfo>> = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, "OK");

        let user = &response.result.unwrap()[0];
        assert_eq!(user.handle, "tourist");
        assert_eq!(user.rating, Some(3775));
        assert_eq!(user.max_rating, Some(4009));
        assert_eq!(user.max_rank.as_deref(), Some("tourist"));
    }

    #[test]
    fn deserialize_problemset_response() {
        let body = r#"{
            "status": "OK",
            "result": {
                "problems": [
                    {
                        "contestId": 2184,
                        "index": "G",
                        "name": "Cactus Coloring",
                        "type": "PROGRAMMING",
                        "tags": ["graphs", "dp"],
                        "rating": 2400
                    },
                    {
                        "contestId": 2184,
                        "index": "A",
                        "name": "Warmup",
                        "type": "PROGRAMMING",
                        "tags": []
                    }
                ],
                "problemStatistics": []
            }
        }"#;

        let response: ApiResponse<ProblemsetResult> = serde_json::from_str(body).unwrap();
        let problems = response.result.unwrap().problems;
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].rating, Some(2400));
        assert_eq!(problems[0].tags, vec!["graphs", "dp"]);
        assert_eq!(problems[1].rating, None);
    }

    #[test]
    fn deserialize_failed_response() {
        let body = r#"{
            "status": "FAILED",
            "comment": "handles: User with handle nobody_here not found"
        }"#;

        let response: ApiResponse<Vec<CfUserInfo>> = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, "FAILED");
        assert!(response.result.is_none());
        assert!(response.comment.unwrap().contains("not found"));
    }
}
