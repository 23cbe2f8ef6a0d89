use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct MovieResult {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TvResult {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    pub first_air_date: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Company {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub job: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub runtime: Option<i32>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub production_companies: Vec<Company>,
    pub original_language: Option<String>,
    pub poster_path: Option<String>,
    pub external_ids: Option<ExternalIds>,
    pub credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
pub struct TvDetails {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    #[serde(default)]
    pub episode_run_time: Vec<i32>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub production_companies: Vec<Company>,
    pub original_language: Option<String>,
    pub poster_path: Option<String>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub external_ids: Option<ExternalIds>,
    pub credits: Option<Credits>,
}
